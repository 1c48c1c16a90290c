use std::{
    io::Write,
    sync::{Arc, Mutex},
    time::Duration,
};

use silhouette_lib_rs::{
    CutterError,
    cutter::{Cutter, EndPosition, Phase, PlotJob, SetupOptions},
    decode::describe_commands,
    geometry::{Path, Point},
    link::{LinkOptions, Timings},
    media::CuttingMat,
    mock::MockTransport,
    profile::DeviceProfile,
};

#[derive(Clone, Default)]
struct Transcript(Arc<Mutex<Vec<u8>>>);

impl Write for Transcript {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn fast_timings() -> Timings {
    Timings {
        retry_backoff: Duration::ZERO,
        fragment_ready_timeout: Duration::from_millis(10),
        fragment_poll_interval: Duration::from_millis(1),
    }
}

fn session(name: &str) -> (MockTransport, Cutter) {
    let mock = MockTransport::dummy();
    let profile = *DeviceProfile::by_name(name).unwrap();
    let options = LinkOptions {
        timings: fast_timings(),
        ..Default::default()
    };

    (mock.clone(), Cutter::new(Box::new(mock), profile, options))
}

fn letter_y() -> Vec<Path> {
    vec![
        vec![Point::new(0.0, 0.0), Point::new(4.5, 10.0), Point::new(4.5, 20.0)],
        vec![Point::new(9.0, 0.0), Point::new(4.5, 10.0)],
    ]
}

#[test]
fn cameo_setup() {
    let (mock, mut cutter) = session("Silhouette Cameo");

    cutter.setup(&SetupOptions::default()).unwrap();

    assert_eq!(
        mock.commands(),
        [
            "\u{1b}\u{4}", "FG", "FW132", "!10", "FX5", "FC18", "FY1", "FN0", "TB50,0", "FE0,0",
        ]
    );
    assert_eq!(cutter.phase(), Phase::Configured);
}

#[test]
fn cameo3_setup() {
    let (mock, mut cutter) = session("Silhouette Cameo3");

    cutter.setup(&SetupOptions::default()).unwrap();

    assert_eq!(
        mock.commands(),
        [
            "\u{1b}\u{4}", "FG", "TB71", "FA", "TC",
            "TG0", "FN0", "TB50,0", "\\0,0", "Z60000,6096",
            "J1", "!10,1", "FX5,1", "FE0,1", "FF1,0,1", "FF1,1,1", "FC0,1,1", "FC18,1,1",
        ]
    );
}

#[test]
fn cameo4_setup_sends_pressure_twice() {
    let (mock, mut cutter) = session("Silhouette Cameo4");

    let options = SetupOptions {
        cutting_mat: CuttingMat::Cameo12x12,
        tool_holder: Some(2),
        ..Default::default()
    };
    cutter.setup(&options).unwrap();

    assert_eq!(
        mock.commands(),
        [
            "\u{1b}\u{4}", "FG", "TB71", "FA",
            "TG1", "FN0", "TB50,0", "\\0,0", "Z6096,6096",
            "J2", "FX5,2", "TJ0", "!10,2", "FC0,1,2", "FE0,2", "FF1,0,2", "FF1,1,2",
            "FX5,2", "TJ3", "FC18,1,2",
        ]
    );
}

#[test]
fn pen_media_on_the_cameo4() {
    let (mock, mut cutter) = session("Silhouette Cameo4");

    let options = SetupOptions {
        media: Some(113),
        ..Default::default()
    };
    cutter.setup(&options).unwrap();

    let commands = mock.commands();
    assert!(commands.ends_with(&[
        "FF0,0,1".to_string(),
        "FF0,0,1".to_string(),
        "FX18,1".to_string(),
        "TJ3".to_string(),
        "FC0,1,1".to_string(),
    ]));
}

#[test]
fn portrait3_sets_up_a_pen_like_a_blade() {
    let (mock, mut cutter) = session("Silhouette Portrait3");
    mock.respond_once(&[0x1b, 0x15], b" 7, 0\x03");

    let options = SetupOptions {
        pen: Some(true),
        ..Default::default()
    };
    cutter.setup(&options).unwrap();

    assert_eq!(
        mock.commands(),
        [
            "\u{1b}\u{4}", "FG", "TB71", "FA", "TI", "\u{1b}\u{11}", "\u{1b}\u{15}",
            "TG0", "FN0", "TB50,0", "!10", "FX5", "TF1,1", "FC0", "FE0,0",
            "FF1,0,0", "FF1,1,0", "FC18",
        ]
    );
}

#[test]
fn portrait3_setup_with_a_blade() {
    let (mock, mut cutter) = session("Silhouette Portrait3");
    mock.respond_once(&[0x1b, 0x15], b" 2, 0\x03");

    let options = SetupOptions {
        blade_diameter: 0.5,
        ..Default::default()
    };
    cutter.setup(&options).unwrap();

    // The autoblade has a diameter of 0.9 mm, whatever the options say.
    let commands = mock.commands();
    assert!(commands.ends_with(&[
        "FF1,0,0".to_string(),
        "FF1,1,0".to_string(),
        "FC18".to_string(),
    ]));
}

#[test]
fn dry_run_records_a_transcript() {
    let mock = MockTransport::dummy();
    let transcript = Transcript::default();
    let options = LinkOptions {
        dry_run: true,
        transcript: Some(Box::new(transcript.clone())),
        timings: fast_timings(),
        ..Default::default()
    };
    let profile = *DeviceProfile::by_name("Silhouette Cameo").unwrap();
    let mut cutter = Cutter::new(Box::new(mock.clone()), profile, options);

    cutter.setup(&SetupOptions::default()).unwrap();
    let outcome = cutter.plot(&PlotJob::new(letter_y())).unwrap();
    assert_eq!(outcome.trailer, ["M420,0", "SO0"]);

    // Only the queries went out.
    assert!(mock.commands().iter().all(|c| c == "FG" || c == "\u{1b}\u{5}"));

    let recorded = transcript.0.lock().unwrap().clone();
    assert!(recorded.starts_with(b"\x1b\x04FW132\x03"));
    assert!(recorded.ends_with(b"M420,0\x03SO0\x03"));

    let names: Vec<_> = describe_commands(&recorded)
        .iter()
        .filter_map(|d| d.name())
        .collect();
    assert_eq!(names[0], "Initialize Device");
    assert_eq!(names.iter().filter(|&&n| n == "Draw Abs").count(), 3);
    assert!(!names.contains(&"Query Firmware"));
}

#[test]
fn cameo_finds_the_regmarks() {
    let (mock, mut cutter) = session("Silhouette Cameo");
    mock.respond_once(b"TB123,4600,3600,200,100\x03", b"    0\x03");

    let job = PlotJob {
        regmark: true,
        regsearch: true,
        offset: (20.0, 25.0),
        ..PlotJob::new(letter_y())
    };
    let outcome = cutter.plot(&job).unwrap();
    assert_eq!(outcome.bbox.clip_count, 0);

    let commands = mock.commands();
    let start = commands.iter().position(|c| c == "TB50,0").unwrap();
    assert_eq!(
        commands[start..start + 9],
        [
            "TB50,0", "TB99", "TB52,2", "TB51,400", "TB53,10", "TB55,1",
            "TB123,4600,3600,200,100", "\\0,0", "Z4600,3600",
        ]
    );

    // Relative to the marks: x = 9 + 20 - 15, y = 1 + 25 - 20.
    assert!(commands.contains(&"M120,280".to_string()));
}

#[test]
fn cameo_reports_missing_regmarks() {
    let (mock, mut cutter) = session("Silhouette Cameo");
    mock.respond_once(b"TB23,4600,3600\x03", b"    1\x03");

    let job = PlotJob {
        regmark: true,
        ..PlotJob::new(letter_y())
    };

    let err = cutter.plot(&job).unwrap_err();
    assert!(matches!(err, CutterError::RegmarkNotFound { .. }));
    assert_eq!(cutter.phase(), Phase::Plotting);
}

#[test]
fn portrait3_reports_missing_regmarks() {
    let (mock, mut cutter) = session("Silhouette Portrait3");
    mock.queue_status(&[b"-1\x03"]);

    let job = PlotJob {
        regmark: true,
        regsearch: true,
        ..PlotJob::new(letter_y())
    };

    match cutter.plot(&job) {
        Err(CutterError::RegmarkNotFound { response }) => assert_eq!(response, "fail"),
        other => panic!("unexpected result: {other:?}"),
    }

    assert!(mock.commands().contains(&"TB123,4600,3600,118,118".to_string()));
}

#[test]
fn letter_y_returns_to_the_start() {
    let (mock, mut cutter) = session("Silhouette Cameo3");

    cutter.setup(&SetupOptions::default()).unwrap();
    mock.clear_writes();

    let job = PlotJob {
        end_position: EndPosition::Start,
        ..PlotJob::new(letter_y())
    };
    let outcome = cutter.plot(&job).unwrap();

    // The Cameo3 needs no cutting area before the plot and has no margins.
    let plotted: Vec<_> = mock
        .commands()
        .into_iter()
        .filter(|c| !c.starts_with('\u{1b}'))
        .collect();

    assert_eq!(
        plotted,
        [
            "M0,0", "D200,90", "D400,90", "M0,180", "D200,90",
            "L0", "\\0,0", "M0,0", "J0", "FN0", "TB50,0",
        ]
    );
    assert_eq!(outcome.bbox.point_count, 5);
    assert_eq!(outcome.bbox.clip_count, 0);
}
