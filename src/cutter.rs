use std::{fmt, time::Duration};

use log::{info, warn};

use crate::{
    cameo,
    codec::{self, Command, Status},
    consts,
    geometry::{plot_commands, BoundingBox, Clipping, Path, Rect},
    link::{Link, LinkOptions},
    media::{CuttingMat, MEDIA_DEFAULT},
    mock::MockTransport,
    portrait,
    profile::{DeviceProfile, Family},
    transport::Transport,
    usb::UsbTransport,
    CutterError, CutterResult,
};

/// Where the session stands. A plot which fails half way leaves the session in
/// [`Phase::Plotting`] or [`Phase::Homing`] until it is initialized again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Initializing,
    Configured,
    Plotting,
    Homing,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Configured => "configured",
            Self::Plotting => "plotting",
            Self::Homing => "homing",
        };

        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct OpenOptions {
    /// Use the profile with this name instead of the detected one.
    pub force_hardware: Option<String>,
}

/// Parameters of [`Cutter::setup`].
#[derive(Debug, Clone, PartialEq)]
pub struct SetupOptions {
    /// Media code, 100..=300. Provides the defaults of pressure, speed and depth.
    pub media: Option<u16>,
    /// 1..=10, 1..=30 on the Cameo4 line.
    pub speed: Option<u32>,
    /// 1..=33. The Cameo runs track enhancing with a pressure of 19 or more.
    pub pressure: Option<u32>,
    /// 0..=10, autoblade only.
    pub depth: Option<u32>,
    /// 1 or 2. Defaults to 1.
    pub tool_holder: Option<u8>,
    /// Defaults to true for the pen media. Ignored by the Portrait3, which sets up pen and blade alike.
    pub pen: Option<bool>,
    pub cutting_mat: CuttingMat,
    pub sharpen_corners: bool,
    pub sharpen_corners_start: f64,
    pub sharpen_corners_end: f64,
    pub autoblade: bool,
    pub sw_clipping: bool,
    pub clip_fuzz: f64,
    pub track_enhancing: Option<bool>,
    pub blade_diameter: f64,
    pub landscape: Option<bool>,
    /// Loaded media is aligned left or right. Defaults to what the device supports.
    pub left_aligned: Option<bool>,
    pub media_width: f64,
    pub media_height: f64,
}

impl Default for SetupOptions {
    fn default() -> Self {
        Self {
            media: Some(MEDIA_DEFAULT),
            speed: None,
            pressure: None,
            depth: None,
            tool_holder: None,
            pen: None,
            cutting_mat: CuttingMat::NoMat,
            sharpen_corners: false,
            sharpen_corners_start: 0.1,
            sharpen_corners_end: 0.1,
            autoblade: false,
            sw_clipping: true,
            clip_fuzz: 0.05,
            track_enhancing: Some(false),
            blade_diameter: 0.9,
            landscape: Some(false),
            left_aligned: None,
            media_width: 210.0,
            media_height: 297.0,
        }
    }
}

/// What [`Cutter::plot`] does with the paths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlotMode {
    /// Cut or draw the paths.
    #[default]
    Cut,
    /// Trace the bounding box of the paths instead.
    Outline,
    /// Only compute the bounding box, nothing is cut.
    MeasureOnly,
}

/// Where the media is left after a plot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EndPosition {
    /// Below the cut, so that the next job can start right away.
    #[default]
    Below,
    /// Back where the plot started.
    Start,
}

/// Parameters of [`Cutter::plot`]. All lengths are in mm.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotJob {
    /// Every path is cut as one connected stroke. The tool is lifted between paths.
    pub paths: Vec<Path>,
    pub media_width: f64,
    pub media_height: f64,
    /// Defaults to the margins of the device.
    pub margin_top: Option<f64>,
    pub margin_left: Option<f64>,
    /// `(x, y)`, moves the design on the media.
    pub offset: (f64, f64),
    pub mode: PlotMode,
    /// Added to the final feed with [`EndPosition::Below`]. Negative values end within the drawing.
    pub end_paper_offset: f64,
    pub end_position: EndPosition,
    /// Align to the registration marks before cutting.
    pub regmark: bool,
    /// Search the marks automatically, otherwise the tool has been placed over the mark by hand.
    pub regsearch: bool,
    pub reg_width: f64,
    pub reg_length: f64,
    pub reg_origin_x: f64,
    pub reg_origin_y: f64,
}

impl PlotJob {
    pub fn new(paths: Vec<Path>) -> Self {
        Self {
            paths,
            media_width: 210.0,
            media_height: 297.0,
            margin_top: None,
            margin_left: None,
            offset: (0.0, 0.0),
            mode: PlotMode::Cut,
            end_paper_offset: 0.0,
            end_position: EndPosition::Below,
            regmark: false,
            regsearch: false,
            reg_width: 180.0,
            reg_length: 230.0,
            reg_origin_x: 15.0,
            reg_origin_y: 20.0,
        }
    }
}

/// Result of a plot.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotOutcome {
    /// Extent of the plotted paths and the clip statistics.
    pub bbox: BoundingBox,
    /// The commands sent after the plot to park the head.
    pub trailer: Vec<Command>,
}

/// A session with one cutter.
pub struct Cutter {
    pub(crate) link: Link,
    profile: DeviceProfile,
    left_aligned: bool,
    clipping: Clipping,
    phase: Phase,
}

/// Finds the first attached cutter and opens a session with it.
///
/// Without a cutter, a dry run continues with an in-memory dummy device.
pub fn open_cutter(options: OpenOptions, link_options: LinkOptions) -> CutterResult<Cutter> {
    let (transport, mut profile): (Box<dyn Transport>, DeviceProfile) = match UsbTransport::open() {
        Ok((usb, profile)) => (Box::new(usb) as Box<dyn Transport>, profile),
        Err(e @ (CutterError::NoDeviceFound { .. } | CutterError::Io(_))) if link_options.dry_run => {
            info!("No device detected ({e}); continuing dry run with dummy device");
            (Box::new(MockTransport::dummy()) as Box<dyn Transport>, DeviceProfile::dummy())
        }
        Err(e) => return Err(e),
    };

    if let Some(name) = options.force_hardware.as_deref() {
        match DeviceProfile::by_name(name) {
            Some(forced) => {
                info!("Overriding device from {profile} to {}", forced.name);
                profile = *forced;
            }
            None => warn!("Unknown hardware {name:?}, keeping {profile}"),
        }
    }

    info!("dev name: {profile}");

    Ok(Cutter::new(transport, profile, link_options))
}

impl Cutter {
    /// Opens a session over the given transport.
    ///
    /// Loaded media is expected left aligned on devices with a known width.
    pub fn new(transport: Box<dyn Transport>, profile: DeviceProfile, link_options: LinkOptions) -> Self {
        Self {
            link: Link::new(transport, link_options),
            left_aligned: profile.width_mm.is_some() || profile.product_id.is_none(),
            profile,
            clipping: Clipping::default(),
            phase: Phase::Uninitialized,
        }
    }

    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn left_aligned(&self) -> bool {
        self.left_aligned
    }

    pub fn clipping(&self) -> Clipping {
        self.clipping
    }

    /// Direct access to the command channel.
    pub fn link_mut(&mut self) -> &mut Link {
        &mut self.link
    }

    /// Sends commands, each terminated.
    pub(crate) fn send<I, C>(&mut self, commands: I) -> CutterResult<()>
    where
        I: IntoIterator<Item = C>,
        C: AsRef<[u8]>,
    {
        self.link
            .send_command(commands, false, consts::DEFAULT_WRITE_TIMEOUT)
    }

    /// Sends a query and logs a non-empty reply.
    pub(crate) fn log_query(&mut self, command: &str) -> CutterResult<()> {
        if let Some(reply) = self.send_receive_command(command)? {
            info!("{command}: '{reply}'");
        }

        Ok(())
    }

    fn reset_device(&mut self) -> CutterResult<()> {
        match self.profile.family {
            Family::Cameo => cameo::initialize(self),
            Family::Portrait => portrait::initialize(self),
        }
    }

    /// Resets the cutter and logs its firmware version. Called by [`Self::setup`].
    pub fn initialize(&mut self) -> CutterResult<()> {
        self.phase = Phase::Initializing;
        self.reset_device()?;
        self.phase = Phase::Configured;

        Ok(())
    }

    /// Initializes the cutter and sends the tool and media parameters.
    pub fn setup(&mut self, options: &SetupOptions) -> CutterResult<()> {
        if let Some(left_aligned) = options.left_aligned {
            self.left_aligned = left_aligned;
        }

        self.phase = Phase::Initializing;
        self.reset_device()?;

        match self.profile.family {
            Family::Cameo => cameo::setup(self, options)?,
            Family::Portrait => portrait::setup(self, options)?,
        }

        self.clipping = Clipping {
            enabled: options.sw_clipping,
            fuzz: options.clip_fuzz,
        };
        self.phase = Phase::Configured;

        Ok(())
    }

    /// Selects the cutting mat and programs the cutting area (Cameo3 and newer).
    pub fn set_cutting_mat(&mut self, mat: CuttingMat, media_width: f64, media_height: f64) -> CutterResult<()> {
        match self.profile.family {
            Family::Cameo => cameo::set_cutting_mat(self, mat, media_width, media_height),
            Family::Portrait => portrait::set_cutting_mat(self, mat),
        }
    }

    /// Prepares the cutting area before the plot data is sent.
    pub fn pre_plot(&mut self, width: f64, height: f64) -> CutterResult<()> {
        match self.profile.family {
            Family::Cameo => cameo::pre_plot(self, width, height),
            Family::Portrait => portrait::pre_plot(self, width, height),
        }
    }

    /// The commands which return the head to where the plot started.
    pub fn home_to_start(&self) -> Vec<Command> {
        match self.profile.family {
            Family::Cameo => cameo::home_to_start(&self.profile),
            Family::Portrait => portrait::home_to_start(),
        }
    }

    /// Aligns the coordinate system to the registration marks.
    ///
    /// `origin_x` and `origin_y` give the position of the marks relative to the design,
    /// `width` and `length` their distance.
    pub fn do_regmark(
        &mut self,
        search: bool,
        origin_x: f64,
        origin_y: f64,
        width: f64,
        length: f64,
    ) -> CutterResult<()> {
        match self.profile.family {
            Family::Cameo => cameo::do_regmark(self, search, origin_x, origin_y, width, length),
            Family::Portrait => portrait::do_regmark(self, search, width, length),
        }
    }

    /// Cuts the paths of the job and parks the head.
    ///
    /// The margins and the media size span the clip rectangle. With left aligned media the width
    /// of the device is used instead of the media width.
    pub fn plot(&mut self, job: &PlotJob) -> CutterResult<PlotOutcome> {
        if matches!(self.phase, Phase::Plotting | Phase::Homing) {
            return Err(CutterError::NeedsReset { phase: self.phase });
        }

        let top = job.margin_top.or(self.profile.margin_top_mm).unwrap_or(0.0);
        let left = job.margin_left.or(self.profile.margin_left_mm).unwrap_or(0.0);

        let media_width = match self.profile.width_mm {
            Some(device_width) if self.left_aligned => device_width,
            _ => job.media_width,
        };

        info!("mediabox: ({left},{top})-({media_width},{})", job.media_height);

        let mut width = media_width.max(left);
        let mut height = job.media_height.max(top);
        let mut offset = job.offset;

        self.phase = Phase::Plotting;

        if job.regmark {
            info!("bb regoriginx={} regoriginy={}", job.reg_origin_x, job.reg_origin_y);

            // After registration (0,0) is at the mark.
            offset = (offset.0 - job.reg_origin_x, offset.1 - job.reg_origin_y);

            width = job.reg_width;
            height = job.reg_length;

            self.do_regmark(
                job.regsearch,
                job.reg_origin_x,
                job.reg_origin_y,
                job.reg_width,
                job.reg_length,
            )?;
        }

        self.pre_plot(width, height)?;

        let clip = Rect {
            llx: left,
            lly: height,
            urx: width,
            ury: top,
        };

        let (mut commands, bbox) = plot_commands(
            &job.paths,
            BoundingBox::with_clip(clip),
            offset,
            self.clipping,
            job.mode == PlotMode::Cut,
        );

        info!("Final bounding box and point counts: {bbox:?}");

        if job.mode == PlotMode::Outline {
            commands = bbox.outline();
        }

        self.link.safe_send_command(&commands)?;

        self.phase = Phase::Homing;

        // The Cameo2 does not start a new job unless it is parked on the left side.
        let trailer = match job.end_position {
            EndPosition::Start => self.home_to_start(),
            EndPosition::Below => vec![
                codec::move_mm(bbox.bounds_or_origin().lly + job.end_paper_offset, 0.0),
                "SO0".to_string(),
            ],
        };

        self.send(&trailer)?;

        self.phase = Phase::Configured;

        Ok(PlotOutcome { bbox, trailer })
    }

    /// Feeds the media by `feed_mm` and makes the new position the origin.
    pub fn move_origin(&mut self, feed_mm: f64) -> CutterResult<()> {
        self.wait_for_ready(consts::DEFAULT_READY_TIMEOUT, consts::DEFAULT_POLL_INTERVAL)?;
        self.send([codec::move_mm(feed_mm, 0.0), "SO0".to_string(), "FN0".to_string()])?;
        self.wait_for_ready(consts::DEFAULT_READY_TIMEOUT, consts::DEFAULT_POLL_INTERVAL)?;

        Ok(())
    }

    pub fn status(&mut self) -> CutterResult<Status> {
        self.link.status()
    }

    /// See [`Link::wait_for_ready`]. The returned status may still be something else than ready.
    pub fn wait_for_ready(&mut self, timeout: Duration, poll_interval: Duration) -> CutterResult<Status> {
        self.link.wait_for_ready(timeout, poll_interval)
    }

    /// Sends a query and returns the reply without its terminator.
    pub fn send_receive_command(&mut self, command: &str) -> CutterResult<Option<String>> {
        self.link
            .send_receive_command(command, consts::DEFAULT_WRITE_TIMEOUT, consts::QUERY_READ_TIMEOUT)
    }

    /// The firmware version.
    pub fn get_version(&mut self) -> CutterResult<Option<String>> {
        self.link.send_receive_command(
            consts::QUERY_FIRMWARE_VERSION,
            consts::DEFAULT_WRITE_TIMEOUT,
            consts::VERSION_READ_TIMEOUT,
        )
    }

    /// The tools installed, e.g. `" 2, 0"` (Cameo4 line and Portrait3 only).
    pub fn get_tool_setup(&mut self) -> CutterResult<Option<String>> {
        if self.profile.family == Family::Cameo && !self.profile.is_cameo4_line() {
            return Ok(None);
        }

        self.link.send_escape(consts::esc::NAK, true)?;

        match self
            .link
            .read(consts::DEFAULT_RX_BUF_SIZE, consts::QUERY_READ_TIMEOUT)
        {
            Ok(reply) if reply.len() > 1 => Ok(Some(codec::latin1(&reply[..reply.len() - 1]))),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{geometry::Point, link::Timings, profile::DEVICES};

    fn session(name: &str) -> (MockTransport, Cutter) {
        let mock = MockTransport::dummy();
        let profile = *DeviceProfile::by_name(name).unwrap();
        let options = LinkOptions {
            timings: Timings {
                retry_backoff: Duration::ZERO,
                fragment_ready_timeout: Duration::from_millis(10),
                fragment_poll_interval: Duration::from_millis(1),
            },
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
    fn alignment_follows_the_device_width() {
        let (_, cutter) = session("Silhouette Cameo");
        assert!(cutter.left_aligned());

        let (_, cutter) = session("Silhouette SD 1");
        assert!(!cutter.left_aligned());
        assert_eq!(cutter.phase(), Phase::Uninitialized);

        assert!(DEVICES.iter().any(|d| d.width_mm.is_none()));
    }

    #[test]
    fn plot_clips_to_the_device_margins() {
        let (mock, mut cutter) = session("Silhouette Cameo");

        let outcome = cutter.plot(&PlotJob::new(letter_y())).unwrap();

        // Cameo margins: 9 mm left, 1 mm top.
        let bounds = outcome.bbox.bounds.unwrap();
        assert_eq!((bounds.llx, bounds.ury, bounds.urx, bounds.lly), (9.0, 1.0, 18.0, 21.0));
        assert_eq!(outcome.trailer, ["M420,0", "SO0"]);

        let commands = mock.commands();
        let plotted: Vec<&str> = commands
            .iter()
            .map(String::as_str)
            .filter(|c| !c.starts_with('\u{1b}'))
            .collect();

        assert_eq!(
            plotted,
            [
                "\\0,0", "Z5940,6080", "L0", "FE0,0", "FF0,0,0",
                "M20,180", "D220,270", "D420,270", "M20,360", "D220,270",
                "M420,0", "SO0",
            ]
        );
        assert_eq!(cutter.phase(), Phase::Configured);
    }

    #[test]
    fn outline_replaces_the_paths() {
        let (_, mut cutter) = session("Silhouette SD 1");

        let job = PlotJob {
            mode: PlotMode::Outline,
            end_position: EndPosition::Start,
            ..PlotJob::new(letter_y())
        };
        let outcome = cutter.plot(&job).unwrap();

        assert_eq!(outcome.trailer, ["H"]);
        assert_eq!(outcome.bbox.outline().len(), 5);
    }

    #[test]
    fn measuring_sends_no_paths() {
        let (mock, mut cutter) = session("Silhouette Portrait3");

        let job = PlotJob {
            mode: PlotMode::MeasureOnly,
            ..PlotJob::new(letter_y())
        };
        let outcome = cutter.plot(&job).unwrap();

        assert_eq!(outcome.bbox.point_count, 5);
        assert!(!mock.commands().iter().any(|c| c.starts_with('D')));
    }

    #[test]
    fn failed_plot_needs_a_reset() {
        let (mock, mut cutter) = session("Silhouette Cameo");
        for _ in 0..6 {
            mock.queue_write_outcome(crate::mock::WriteOutcome::Accept(0));
        }

        assert!(matches!(
            cutter.plot(&PlotJob::new(letter_y())),
            Err(CutterError::WriteFailed { .. })
        ));
        assert_eq!(cutter.phase(), Phase::Plotting);

        let err = cutter.plot(&PlotJob::new(letter_y())).unwrap_err();
        assert!(matches!(err, CutterError::NeedsReset { phase: Phase::Plotting }));
        assert_eq!(
            err.to_string(),
            "A previous plot was aborted while plotting, initialize the cutter again"
        );

        cutter.initialize().unwrap();
        cutter.plot(&PlotJob::new(letter_y())).unwrap();
    }

    #[test]
    fn tool_setup_is_only_queried_on_newer_cutters() {
        let (mock, mut cutter) = session("Silhouette Cameo3");
        assert_eq!(cutter.get_tool_setup().unwrap(), None);
        assert!(mock.writes().is_empty());

        let (mock, mut cutter) = session("Silhouette Cameo4");
        mock.respond_once(&[0x1b, 0x15], b" 1, 0\x03");
        assert_eq!(cutter.get_tool_setup().unwrap().as_deref(), Some(" 1, 0"));
    }

    #[test]
    fn move_origin_feeds_and_resets() {
        let (mock, mut cutter) = session("Silhouette Cameo");

        cutter.move_origin(50.0).unwrap();

        let commands = mock.commands();
        assert!(commands.ends_with(&[
            "M1000,0".to_string(),
            "SO0".to_string(),
            "FN0".to_string(),
            "\u{1b}\u{5}".to_string(),
        ]));
    }
}
