//! Command sequences of the Portrait3.

use std::thread;

use log::{debug, info, warn};

use crate::{
    codec::{self, Command, Status},
    consts::{self, esc},
    cutter::{Cutter, SetupOptions},
    media::{lookup_media, normalize_media_code, CuttingMat, ToolId},
    tool::Tool,
    units::mm_to_units,
    CutterError, CutterResult,
};

pub(crate) fn initialize(cutter: &mut Cutter) -> CutterResult<()> {
    cutter
        .link
        .send_escape(esc::EOT, false)
        .map_err(|e| CutterError::Initialize(Box::new(e)))?;

    let version = cutter.get_version()?;
    info!("Device Version: '{}'", version.as_deref().unwrap_or("None"));

    cutter.log_query("TB71")?;
    cutter.log_query("FA")?;
    cutter.log_query("TI")?;

    // Device name and firmware, e.g. "Portrait 3 V1.04    ".
    cutter.link.send_escape(esc::DC1, true)?;

    match cutter
        .link
        .read(consts::DEFAULT_RX_BUF_SIZE, consts::QUERY_READ_TIMEOUT)
    {
        Ok(reply) => info!("Device name: '{}'", codec::latin1(&reply)),
        Err(e) => debug!("No device name: {e}"),
    }

    Ok(())
}

/// Selects the mat. The cutting area is not programmed.
pub(crate) fn set_cutting_mat(cutter: &mut Cutter, mat: CuttingMat) -> CutterResult<()> {
    cutter.send([codec::cutting_mat(mat.code())])
}

pub(crate) fn setup(cutter: &mut Cutter, options: &SetupOptions) -> CutterResult<()> {
    let tool = Tool::Portrait;

    let mut autoblade = options.autoblade;
    let mut blade_diameter = options.blade_diameter;

    let setup = cutter.get_tool_setup()?;
    info!("tool resp: {}", setup.as_deref().unwrap_or("none"));

    // The installed tool wins over the options.
    match setup.as_deref().and_then(ToolId::from_setup) {
        Some(ToolId::AutoBlade) => {
            autoblade = true;
            blade_diameter = 0.9;
        }
        Some(ToolId::Fault) => warn!("The cutter reports a tool error"),
        other => info!("tool: {other:?}"),
    }

    set_cutting_mat(cutter, options.cutting_mat)?;
    cutter.send(codec::orientation(options.landscape.unwrap_or(false)))?;

    let mut pressure = options.pressure;
    let mut speed = options.speed;
    let mut depth = options.depth;

    if autoblade {
        if let Some(d) = depth {
            info!("manual depth setting: {}", d.min(10));
        }
    }

    if let Some(code) = options.media {
        let code = normalize_media_code(code);

        if let Some(media) = lookup_media(code) {
            info!("Media={code}, cap='{}', name='{}'", media.cap, media.name);

            pressure = pressure.or(media.pressure);
            speed = speed.or(media.speed);
            depth = depth.or(media.depth);
        }
    }

    if let Some(s) = speed {
        let s = s.clamp(1, 10);
        cutter.send([tool.speed(s)])?;
        info!("speed: {s}");
    }

    if let Some(p) = pressure {
        let p = p.clamp(1, 33);
        cutter.send([tool.pressure(p)])?;
        info!("pressure: {p}");
    }

    if let Some(d) = depth {
        cutter.send([tool.depth(d.min(10))])?;
    }

    cutter.send(["FC0"])?;

    if cutter.left_aligned() {
        info!("Loaded media is expected left-aligned.");
    } else {
        info!("Loaded media is expected right-aligned.");
    }

    // The same tool parameters for pen and blade.
    cutter.send([tool.lift(false)])?;
    cutter.send(tool.sharpen_corners(1, 1))?;
    cutter.send([format!("FC{}", mm_to_units(blade_diameter))])?;

    Ok(())
}

/// Runs the registration mark search and waits for its outcome.
///
/// The Portrait3 reports the search through its status: moving while searching, fail if no mark was found.
pub(crate) fn do_regmark(cutter: &mut Cutter, search: bool, width: f64, length: f64) -> CutterResult<()> {
    for cmd in codec::regmark_setup() {
        cutter.send([cmd])?;
    }

    let cmd = if search {
        // 5.9 mm is the size of the regmark square.
        codec::automatic_regmark_mm(length, width, 5.9, 5.9)
    } else {
        codec::manual_regmark_mm(length, width)
    };

    cutter.send([cmd])?;
    cutter.send(["TB99"])?;

    let mut state = cutter.status()?;
    while state == Status::Moving {
        thread::sleep(consts::REGMARK_POLL_INTERVAL);
        state = cutter.status()?;
    }

    if state == Status::Fail {
        return Err(CutterError::RegmarkNotFound {
            response: state.to_string(),
        });
    }

    cutter.wait_for_ready(consts::REGMARK_READY_TIMEOUT, consts::REGMARK_READY_POLL_INTERVAL)?;

    Ok(())
}

pub(crate) fn pre_plot(cutter: &mut Cutter, width: f64, height: f64) -> CutterResult<()> {
    cutter.send([codec::upper_left_mm(0.0, 0.0), codec::lower_right_mm(height, width)])
}

pub(crate) fn home_to_start() -> Vec<Command> {
    vec![
        "TB0".to_string(),
        "L0".to_string(),
        codec::upper_left_mm(0.0, 0.0),
        codec::move_mm(0.0, 0.0),
        "FN0".to_string(),
        "TB50,0".to_string(),
    ]
}
