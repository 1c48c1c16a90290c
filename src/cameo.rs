//! Command sequences of the Cameo family: Cameo 1 to 4, Portrait 1 and 2, Craft Robo and SD.

use log::info;

use crate::{
    codec::{self, Command},
    consts::{self, esc, resp},
    cutter::{Cutter, SetupOptions},
    media::{lookup_media, normalize_media_code, CuttingMat, MEDIA_PEN},
    profile::DeviceProfile,
    tool::{sharpen_tenths, Tool},
    units::{inch_to_units, mm_to_units},
    CutterError, CutterResult,
};

pub(crate) fn initialize(cutter: &mut Cutter) -> CutterResult<()> {
    cutter
        .link
        .send_escape(esc::EOT, false)
        .map_err(|e| CutterError::Initialize(Box::new(e)))?;

    let version = cutter.get_version()?;
    info!("Device Version: '{}'", version.as_deref().unwrap_or("None"));

    let profile = *cutter.profile();

    if profile.is_cameo3_on() {
        // Stored calibration of the regmark sensor, then of carriage and roller.
        cutter.log_query("TB71")?;
        cutter.log_query("FA")?;
    }

    // Silhouette Studio does not send this to the Cameo4.
    if profile.is_cameo3() {
        cutter.log_query("TC")?;
    }

    Ok(())
}

/// Selects the mat and programs the cutting area. Older cutters know no mats.
pub(crate) fn set_cutting_mat(
    cutter: &mut Cutter,
    mat: CuttingMat,
    media_width: f64,
    media_height: f64,
) -> CutterResult<()> {
    let profile = *cutter.profile();

    if !profile.is_cameo3_on() {
        return Ok(());
    }

    cutter.send([codec::cutting_mat(mat.code())])?;
    cutter.send(codec::orientation(false))?;

    let boundary = match mat.size_inches() {
        Some((bottom, right)) => codec::boundary(
            0,
            0,
            inch_to_units(f64::from(bottom)),
            inch_to_units(f64::from(right)),
        ),
        None => codec::boundary(
            0,
            0,
            mm_to_units(profile.length_mm.unwrap_or(media_height)),
            mm_to_units(profile.width_mm.unwrap_or(media_width)),
        ),
    };

    cutter.send(boundary)
}

pub(crate) fn setup(cutter: &mut Cutter, options: &SetupOptions) -> CutterResult<()> {
    let profile = *cutter.profile();
    let cameo3_on = profile.is_cameo3_on();
    let cameo3 = profile.is_cameo3();

    set_cutting_mat(cutter, options.cutting_mat, options.media_width, options.media_height)?;

    let mut pressure = options.pressure;
    let mut speed = options.speed;
    let mut depth = options.depth;
    let mut pen = options.pen;

    if let Some(code) = options.media {
        let code = normalize_media_code(code);

        // Silhouette Studio does not send the media to newer cutters.
        if !cameo3_on {
            cutter.send([codec::media(code)])?;
        }

        if pen.is_none() {
            pen = Some(code == MEDIA_PEN);
        }

        if let Some(media) = lookup_media(code) {
            info!("Media={code}, cap='{}', name='{}'", media.cap, media.name);

            pressure = pressure.or(media.pressure);
            speed = speed.or(media.speed);
            depth = depth.or(media.depth);
        }
    }

    let pen = pen.unwrap_or(false);
    let tool = Tool::cameo(options.tool_holder);
    let holder = options.tool_holder.unwrap_or(1);

    if cameo3_on {
        if let Some(select) = tool.select() {
            cutter.send([select])?;
        }
    }

    info!("toolholder: {holder}");

    let sharpen = if pen {
        tool.sharpen_corners(0, 0)
    } else {
        tool.sharpen_corners(
            sharpen_tenths(options.sharpen_corners_start),
            sharpen_tenths(options.sharpen_corners_end),
        )
    };

    if profile.is_cameo4_line() {
        // The Cameo4 gets force, acceleration and cutter offset twice.
        if let Some(p) = pressure {
            let p = p.clamp(1, 33);
            cutter.send([tool.pressure(p)])?;
            info!("pressure: {p}");

            // Always 0 on the first connection.
            cutter.send([codec::acceleration(0)])?;
        }

        if let Some(s) = speed {
            let s = s.clamp(1, 30);
            cutter.send([tool.speed(s)])?;
            info!("speed: {s}");
        }

        cutter.send([tool.cutter_offset(0.0, 0.05)])?;
        cutter.send([tool.lift(options.sharpen_corners)])?;
        cutter.send(&sharpen)?;

        if let Some(p) = pressure {
            let p = p.clamp(1, 33);
            cutter.send([tool.pressure(p)])?;
            info!("pressure: {p}");
            cutter.send([codec::acceleration(3)])?;
        }

        let diameter = if pen { 0.0 } else { options.blade_diameter };
        cutter.send([tool.cutter_offset(diameter, 0.05)])?;
    } else {
        if let Some(s) = speed {
            let s = s.clamp(1, 10);
            let cmd = if cameo3 { tool.speed(s) } else { format!("!{s}") };
            cutter.send([cmd])?;
            info!("speed: {s}");
        }

        if let Some(p) = pressure {
            let p = p.clamp(1, 33);
            let cmd = if cameo3 { tool.pressure(p) } else { format!("FX{p}") };
            cutter.send([cmd])?;
            info!("pressure: {p}");
        }

        if cameo3 && pen {
            cutter.send([tool.cutter_offset(0.0, 0.05)])?;
        }

        if cutter.left_aligned() {
            info!("Loaded media is expected left-aligned.");
        } else {
            info!("Loaded media is expected right-aligned.");
        }

        if cameo3 {
            cutter.send([tool.lift(options.sharpen_corners)])?;
            cutter.send(&sharpen)?;

            if !pen {
                cutter.send([
                    tool.cutter_offset(0.0, 0.05),
                    tool.cutter_offset(options.blade_diameter, 0.05),
                ])?;
            }
        } else {
            // 0 for the pen, 18 for a 0.9 mm blade. Values above 47 are ignored by the cutter.
            let offset = if pen { 0 } else { mm_to_units(options.blade_diameter) };
            cutter.send([format!("FC{offset}")])?;
        }
    }

    if cameo3_on && options.autoblade && holder == 1 {
        if let Some(d) = depth {
            let d = d.min(10);
            cutter.send([tool.depth(d)])?;
            info!("depth: {d}");
        }
    }

    // Track enhancing moves the rollers three times forward and back, it needs a pressure of 19 or more.
    match options.track_enhancing {
        Some(true) => cutter.send([codec::track_enhancing(true)])?,
        Some(false) if !cameo3_on => cutter.send([codec::track_enhancing(false)])?,
        _ => {}
    }

    if !cameo3_on {
        if let Some(landscape) = options.landscape {
            cutter.send(codec::orientation(landscape))?;
        }

        // Don't lift the head between paths.
        cutter.send(["FE0,0"])?;
    }

    Ok(())
}

pub(crate) fn do_regmark(
    cutter: &mut Cutter,
    search: bool,
    origin_x: f64,
    origin_y: f64,
    width: f64,
    length: f64,
) -> CutterResult<()> {
    for cmd in codec::regmark_setup() {
        cutter.send([cmd])?;
    }

    let cmd = if search {
        // Search within 10 mm of the expected position.
        codec::automatic_regmark_mm(length, width, origin_y - 10.0, origin_x - 10.0)
    } else {
        codec::manual_regmark_mm(length, width)
    };

    cutter.send([cmd])?;

    if cutter.link.dry_run() {
        info!("Dry run, assuming the registration marks were found");
        return Ok(());
    }

    let reply = cutter
        .link
        .read(consts::DEFAULT_RX_BUF_SIZE, consts::REGMARK_READ_TIMEOUT);

    match reply {
        Ok(reply) if reply == resp::REGMARK_FOUND => Ok(()),
        Ok(reply) => Err(CutterError::RegmarkNotFound {
            response: format!("{:?}", codec::latin1(&reply)),
        }),
        Err(e) => Err(CutterError::RegmarkNotFound {
            response: e.to_string(),
        }),
    }
}

pub(crate) fn pre_plot(cutter: &mut Cutter, width: f64, height: f64) -> CutterResult<()> {
    if cutter.profile().is_cameo3_on() {
        return Ok(());
    }

    cutter.send([
        codec::upper_left_mm(0.0, 0.0),
        codec::lower_right_mm(height, width),
        "L0".to_string(),
        "FE0,0".to_string(),
        "FF0,0,0".to_string(),
    ])
}

pub(crate) fn home_to_start(profile: &DeviceProfile) -> Vec<Command> {
    if !profile.is_cameo3_on() {
        return vec!["H".to_string()];
    }

    vec![
        "L0".to_string(),
        codec::upper_left_mm(0.0, 0.0),
        codec::move_mm(0.0, 0.0),
        "J0".to_string(),
        "FN0".to_string(),
        "TB50,0".to_string(),
    ]
}
