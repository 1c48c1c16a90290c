use silhouette_lib_rs::{
    cutter::{open_cutter, OpenOptions, PlotJob, SetupOptions},
    decode::describe_transcript,
    geometry::Path,
    link::LinkOptions,
};
use std::fs::{self, File};

const TRANSCRIPT: &str = "letter_y.transcript";

/// This example cuts the letter Y. Without `--cut` it's a dry run which only records the commands,
/// no cutter needs to be attached for that.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let dry_run = !std::env::args().any(|arg| arg == "--cut");

    let link_options = LinkOptions {
        dry_run,
        transcript: Some(Box::new(File::create(TRANSCRIPT)?)),
        ..Default::default()
    };

    let mut cutter = open_cutter(OpenOptions::default(), link_options)?;

    println!("Using {}", cutter.profile());

    cutter.setup(&SetupOptions {
        speed: Some(5),
        pressure: Some(10),
        ..Default::default()
    })?;

    let paths: Vec<Path> = vec![
        vec![(0.0, 0.0).into(), (4.5, 10.0).into(), (4.5, 20.0).into()],
        vec![(9.0, 0.0).into(), (4.5, 10.0).into()],
    ];

    let outcome = cutter.plot(&PlotJob {
        offset: (10.0, 10.0),
        ..PlotJob::new(paths)
    })?;

    println!(
        "Bounding box: {:?}, {} points, {} clipped",
        outcome.bbox.bounds, outcome.bbox.point_count, outcome.bbox.clip_count
    );

    // The transcript is flushed when the cutter goes away.
    drop(cutter);

    println!("{}", describe_transcript(&fs::read(TRANSCRIPT)?));

    Ok(())
}
