//! Answer analysis gateway

mod decision;
mod gateway;

pub use decision::{Decision, DecisionSource, Verdict};
pub use gateway::{AnalysisGateway, AnalysisRequest, InFlightGuard};
