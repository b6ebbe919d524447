use anyhow::{Context, Result};
use std::io::Cursor;

/// Size of the RIFF/fmt/data header hound writes for 16-bit PCM
pub const WAV_HEADER_BYTES: usize = 44;

/// Encode interleaved 16-bit PCM samples as an in-memory WAV file
pub fn encode_wav<'a, I>(samples: I, sample_rate: u32, channels: u16) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = &'a i16>,
{
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut bytes = Vec::new();
    {
        let mut writer = hound::WavWriter::new(Cursor::new(&mut bytes), spec)
            .context("Failed to create WAV writer")?;

        for &sample in samples {
            writer
                .write_sample(sample)
                .context("Failed to write sample to WAV")?;
        }

        writer.finalize().context("Failed to finalize WAV data")?;
    }

    Ok(bytes)
}

/// Decode WAV bytes back into samples
pub fn decode_wav(bytes: &[u8]) -> Result<(hound::WavSpec, Vec<i16>)> {
    let reader = hound::WavReader::new(Cursor::new(bytes)).context("Invalid WAV data")?;
    let spec = reader.spec();
    let samples = reader
        .into_samples::<i16>()
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to read WAV samples")?;
    Ok((spec, samples))
}
