//! Runs one detection session per observation file.

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use condenser_engine::{
    DetectionSession, EngineConfig, OrderedFrames, ReportMeta, ZoneTester,
};
use condenser_models::{ClipReport, FrameInput, VideoProps};
use tracing::{debug, info};

use crate::args::Args;
use crate::output;

/// Frames allowed to wait behind a missing one before the file is rejected.
pub const MAX_PENDING_FRAMES: usize = 512;

/// Inputs for one session.
#[derive(Debug, Clone)]
pub struct SessionJob {
    pub input: PathBuf,
    pub zones: PathBuf,
    pub config: EngineConfig,
    pub video: VideoProps,
}

/// Detect clips in one observation file.
///
/// Lines may arrive in any order; they are re-sequenced by frame index.
/// Frames off the sampling grid are skipped.
pub fn process_file(job: &SessionJob) -> Result<ClipReport> {
    let zones = ZoneTester::from_file(&job.zones)
        .with_context(|| format!("Failed to load zones {}", job.zones.display()))?;

    let name = job
        .input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut session =
        DetectionSession::with_name(job.config.clone(), zones, job.video, &name)?;
    let span = session.logger().create_span();
    let _guard = span.enter();

    let file = std::fs::File::open(&job.input)
        .with_context(|| format!("Failed to open {}", job.input.display()))?;
    let reader = BufReader::new(file);

    let mut ordered = OrderedFrames::bounded(MAX_PENDING_FRAMES);
    let mut skipped = 0u64;

    for (i, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read {}", job.input.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let input = FrameInput::parse_line(i + 1, &line)?;

        let Some(sequence) = session.plan().sequence(input.frame()) else {
            skipped += 1;
            continue;
        };
        ordered.push(sequence, input)?;

        for input in ordered.drain_ready() {
            session.process_input(&input)?;
        }
    }
    ordered.finish()?;

    if skipped > 0 {
        debug!(skipped, "Skipped frames off the sampling grid");
    }

    let meta = ReportMeta::new(
        job.input.to_string_lossy(),
        job.zones.to_string_lossy(),
    );
    Ok(session.finish(&meta))
}

/// Process every input in parallel (one blocking task per session) and
/// write each report. Returns the reports in input order.
pub async fn run(args: &Args) -> Result<Vec<(PathBuf, ClipReport)>> {
    let config = args.engine_config()?;
    let video = args.video_props();
    let started = Instant::now();

    let handles: Vec<_> = args
        .inputs
        .iter()
        .map(|input| {
            let job = SessionJob {
                input: input.clone(),
                zones: args.zones.clone(),
                config: config.clone(),
                video,
            };
            tokio::task::spawn_blocking(move || {
                process_file(&job).with_context(|| format!("Failed to process {}", job.input.display()))
            })
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for (input, handle) in args.inputs.iter().zip(handles) {
        let report = handle.await.context("Session task panicked")??;
        let path = args.output_for(input);
        write_report(&path, &report)?;

        if !args.quiet {
            println!("{}", output::summary_table(&report));
            println!("Saved {} clips to {}", report.clips.len(), path.display());
        }
        results.push((path, report));
    }

    info!(
        inputs = results.len(),
        elapsed_secs = started.elapsed().as_secs_f64(),
        "All sessions finished"
    );
    Ok(results)
}

fn write_report(path: &Path, report: &ClipReport) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    const ZONES: &str = "[[[0,0],[200,0],[200,200],[0,200]],[[400,0],[600,0],[600,200],[400,200]]]";

    /// In position for 5s, moving out of position for 5s, still for 5s.
    fn observations(dir: &Path, name: &str, shuffled: bool) -> PathBuf {
        let mut lines = Vec::new();
        for (tick, frame) in (3..=450u64).step_by(3).enumerate() {
            let (y, dx) = match frame {
                0..=150 => (100, 0),
                151..=300 => (300, if tick % 2 == 0 { 60 } else { 0 }),
                _ => (300, 0),
            };
            lines.push(format!(
                r#"{{"frame":{frame},"ankles":[[100,{y}],[500,{y}]],"hips":[[{},50],[{},50]]}}"#,
                100 + dx,
                500 + dx
            ));
        }
        // Off-grid frames are ignored.
        lines.push(r#"{"frame":4,"ankles":[],"hips":[]}"#.to_string());
        if shuffled {
            lines.reverse();
        }

        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        path
    }

    fn job(dir: &Path, input: PathBuf) -> SessionJob {
        let zones = dir.join("court_zones.json");
        std::fs::write(&zones, ZONES).unwrap();
        SessionJob {
            input,
            zones,
            config: EngineConfig::default(),
            video: VideoProps::new(30.0, 640, 360).with_frame_count(450),
        }
    }

    #[test]
    fn test_process_file_finds_rally() {
        let dir = tempfile::tempdir().unwrap();
        let input = observations(dir.path(), "match.jsonl", false);
        let report = process_file(&job(dir.path(), input)).unwrap();

        assert_eq!(report.video, "match.jsonl");
        assert_eq!(report.clips.len(), 1);
        assert_eq!(report.summary().rally, 1);
    }

    #[test]
    fn test_order_of_lines_does_not_matter() {
        let dir = tempfile::tempdir().unwrap();
        let a = process_file(&job(dir.path(), observations(dir.path(), "a.jsonl", false))).unwrap();
        let b = process_file(&job(dir.path(), observations(dir.path(), "b.jsonl", true))).unwrap();
        assert_eq!(a.clips, b.clips);
    }

    #[test]
    fn test_missing_zones_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = observations(dir.path(), "match.jsonl", false);
        let mut job = job(dir.path(), input);
        job.zones = dir.path().join("missing.json");
        assert!(process_file(&job).is_err());
    }

    #[test]
    fn test_gap_in_frames_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("gap.jsonl");
        std::fs::write(
            &input,
            "{\"frame\":3,\"ankles\":[],\"hips\":[]}\n{\"frame\":9,\"ankles\":[],\"hips\":[]}\n",
        )
        .unwrap();
        let err = process_file(&job(dir.path(), input)).unwrap_err();
        assert!(err.to_string().contains("Missing frame"));
    }

    #[test]
    fn test_gap_fails_before_end_of_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("gap.jsonl");
        // Frame 3 never arrives; everything after it piles up.
        let lines: String = (2..=(MAX_PENDING_FRAMES as u64 + 10))
            .map(|i| format!("{{\"frame\":{},\"ankles\":[],\"hips\":[]}}\n", i * 3))
            .collect();
        std::fs::write(&input, lines).unwrap();

        let err = process_file(&job(dir.path(), input)).unwrap_err();
        let engine_err = err.downcast_ref::<condenser_engine::EngineError>().unwrap();
        assert!(matches!(
            engine_err,
            condenser_engine::EngineError::MissingFrames {
                expected: 0,
                pending,
            } if *pending == MAX_PENDING_FRAMES + 1
        ));
    }

    #[tokio::test]
    async fn test_run_writes_one_report_per_input() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("court_zones.json"), ZONES).unwrap();
        let one = observations(dir.path(), "one.jsonl", false);
        let two = observations(dir.path(), "two.jsonl", true);
        let out = dir.path().join("reports");

        let args = Args::try_parse_from([
            "condenser",
            one.to_str().unwrap(),
            two.to_str().unwrap(),
            "--zones",
            dir.path().join("court_zones.json").to_str().unwrap(),
            "--fps",
            "30",
            "--width",
            "640",
            "--height",
            "360",
            "-o",
            out.to_str().unwrap(),
            "-q",
        ])
        .unwrap();

        let results = tokio_test::assert_ok!(run(&args).await);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, out.join("one.clips.json"));

        let written = std::fs::read_to_string(out.join("two.clips.json")).unwrap();
        let report: ClipReport = serde_json::from_str(&written).unwrap();
        assert_eq!(report.clips.len(), 1);
        assert_eq!(report.resolution.original, "640x360");
    }
}
