// Integration tests for chunked capture
//
// These tests drive the live stream and both recorders directly: chunks are
// emitted on the timeslice, capture windows exclude earlier audio, and the
// session recording keeps growing across windows.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use voice_interviewer::audio::{decode_wav, AudioFrame, LiveStream, WAV_HEADER_BYTES};
use voice_interviewer::capture::{
    AnswerCapture, CaptureConfig, ChunkedRecorder, MediaCaptureManager, RecorderConfig,
};

const SAMPLES_PER_FRAME: usize = 1600; // 100ms at 16kHz

fn frame(timestamp_ms: u64, value: i16) -> AudioFrame {
    AudioFrame {
        samples: vec![value; SAMPLES_PER_FRAME],
        sample_rate: 16000,
        channels: 1,
        timestamp_ms,
    }
}

async fn send_frames(
    tx: &mpsc::Sender<AudioFrame>,
    from_ms: u64,
    count: u64,
    value: i16,
) -> Result<()> {
    for i in 0..count {
        tx.send(frame(from_ms + i * 100, value)).await?;
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    Ok(())
}

fn live() -> (mpsc::Sender<AudioFrame>, Arc<LiveStream>) {
    let (tx, rx) = mpsc::channel(100);
    (tx, Arc::new(LiveStream::spawn(rx)))
}

#[tokio::test(start_paused = true)]
async fn test_recorder_emits_chunk_per_timeslice() -> Result<()> {
    let (tx, stream) = live();
    let recorder = ChunkedRecorder::start(
        RecorderConfig::new("test", Duration::from_millis(500)),
        stream.subscribe(),
    );

    // 2 seconds of audio at 500ms timeslices
    send_frames(&tx, 0, 20, 7).await?;
    let stats = recorder.stop().await;

    assert!(
        (4..=5).contains(&stats.chunks_emitted),
        "expected about 4 chunks, got {}",
        stats.chunks_emitted
    );
    assert_eq!(stats.bytes_emitted, 20 * SAMPLES_PER_FRAME as u64 * 2);
    assert!(!stats.is_recording);

    let chunks = recorder.chunks().await;
    for pair in chunks.windows(2) {
        assert_eq!(pair[1].index, pair[0].index + 1);
        assert!(pair[1].start_ms > pair[0].end_ms);
    }

    let (spec, samples) = decode_wav(&recorder.assemble().await?)?;
    assert_eq!(spec.sample_rate, 16000);
    assert_eq!(spec.channels, 1);
    assert_eq!(samples.len(), 20 * SAMPLES_PER_FRAME);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_request_data_flushes_early() -> Result<()> {
    let (tx, stream) = live();
    let recorder = ChunkedRecorder::start(
        RecorderConfig::new("test", Duration::from_secs(60)),
        stream.subscribe(),
    );

    send_frames(&tx, 0, 3, 1).await?;
    assert!(recorder.chunks().await.is_empty(), "timeslice not reached yet");

    recorder.request_data();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let chunks = recorder.chunks().await;
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].frames.len(), 3);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_stop_is_idempotent() -> Result<()> {
    let (tx, stream) = live();
    let recorder = ChunkedRecorder::start(
        RecorderConfig::new("test", Duration::from_secs(1)),
        stream.subscribe(),
    );
    send_frames(&tx, 0, 2, 1).await?;

    let first = recorder.stop().await;
    let second = recorder.stop().await;

    assert_eq!(first.chunks_emitted, 1, "final chunk emitted on stop");
    assert_eq!(first.chunks_emitted, second.chunks_emitted);
    assert_eq!(first.bytes_emitted, second.bytes_emitted);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_window_excludes_audio_before_it_opened() -> Result<()> {
    let (tx, stream) = live();
    let capture = MediaCaptureManager::start(CaptureConfig::default(), Arc::clone(&stream));

    // Interviewer speaking: the candidate's mic picks up 2s of loud audio
    send_frames(&tx, 0, 20, 9000).await?;

    capture.begin_window().await?;

    // The actual answer
    send_frames(&tx, 2000, 10, 5).await?;

    let audio = match capture.flush().await? {
        AnswerCapture::Ready(audio) => audio,
        other => panic!("expected a usable answer, got {} bytes", other.byte_len()),
    };

    let (_, samples) = decode_wav(&audio)?;
    assert_eq!(samples.len(), 10 * SAMPLES_PER_FRAME);
    assert!(samples.iter().all(|&s| s == 5), "pre-window audio leaked in");

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_frames_queued_before_window_are_excluded() -> Result<()> {
    let (tx, stream) = live();
    let capture = MediaCaptureManager::start(CaptureConfig::default(), Arc::clone(&stream));

    // Queued on the device but not yet forwarded when the window opens
    for i in 0..5 {
        tx.send(frame(i * 100, 9000)).await?;
    }
    capture.begin_window().await?;
    send_frames(&tx, 500, 5, 3).await?;

    let audio = capture.flush().await?;
    let AnswerCapture::Ready(audio) = audio else {
        panic!("answer should pass the size guard");
    };
    let (_, samples) = decode_wav(&audio)?;
    assert!(samples.iter().all(|&s| s == 3));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_silent_window_is_too_short() -> Result<()> {
    let (_tx, stream) = live();
    let capture = MediaCaptureManager::start(CaptureConfig::default(), Arc::clone(&stream));

    capture.begin_window().await?;
    tokio::time::sleep(Duration::from_secs(3)).await;

    match capture.flush().await? {
        AnswerCapture::TooShort { bytes } => assert_eq!(bytes, WAV_HEADER_BYTES),
        AnswerCapture::Ready(audio) => panic!("empty window produced {} bytes", audio.len()),
    }

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_session_recording_grows_across_windows() -> Result<()> {
    let (tx, stream) = live();
    let capture = MediaCaptureManager::start(CaptureConfig::default(), Arc::clone(&stream));

    let mut last_chunks = 0;
    let mut last_bytes = 0;
    let mut last_answer_chunks = 0;
    for window in 0..4u64 {
        capture.begin_window().await?;
        send_frames(&tx, window * 3000, 30, 100).await?;
        capture.flush().await?;

        let stats = capture.session_stats().await;
        assert!(stats.chunks_emitted >= last_chunks);
        assert!(stats.bytes_emitted > last_bytes);
        last_chunks = stats.chunks_emitted;
        last_bytes = stats.bytes_emitted;

        // Window resets never lower the answer recorder's counters
        let answer = capture.answer_stats().await;
        assert!(answer.is_recording);
        assert!(answer.chunks_emitted > last_answer_chunks);
        last_answer_chunks = answer.chunks_emitted;

        // The answer recorder only ever holds the current window
        let (_, answer) = decode_wav(&match capture.flush().await? {
            AnswerCapture::Ready(audio) => audio,
            AnswerCapture::TooShort { .. } => panic!("window {} lost its audio", window),
        })?;
        assert_eq!(answer.len(), 30 * SAMPLES_PER_FRAME);
    }

    let recording = capture.finish().await?;
    assert!(!capture.answer_stats().await.is_recording);
    let (_, samples) = decode_wav(&recording.bytes)?;
    assert_eq!(samples.len(), 4 * 30 * SAMPLES_PER_FRAME);
    assert!(recording.chunk_count >= last_chunks);

    // Stopping again does nothing
    assert!(!capture.stop().await);

    Ok(())
}
