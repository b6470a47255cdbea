use std::error::Error;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use image::imageops::FilterType;
use image::{ImageFormat, RgbImage};

use ut2000_linux::protocol::DEFAULT_MAX_RETRIES;
use ut2000_linux::{
    decode_screenshot, AcquisitionConfig, Colormap, Device, DeviceModel, FrameKind, RawFrame,
    ScreenshotImage, SUPPORTED_DEVICES,
};

/// Largest accepted `--magnify`; a 400x240 screen becomes 6400x3840.
const MAX_MAGNIFY: i64 = 16;

const AFTER_HELP: &str = "\
SUPPORTED DEVICES:
    UT2025B     5656:0832  (vendor control transfers)
    UT2102C     5656:0834  (vendor control transfers)
    UT2052CEL   4348:5537  (bulk writes)

EXAMPLES:
    sudo ut2000-linux screenshot -o scope.png --magnify 2
    sudo ut2000-linux screenshot --raw -o scope.bin
    sudo ut2000-linux samples -o samples.json
    ut2000-linux convert scope.bin scope.png --model ut2025b";

#[derive(Parser)]
#[command(
    name = "ut2000-linux",
    version,
    about = "Screenshot and waveform retrieval for UNI-T UT2000 series oscilloscopes",
    after_help = AFTER_HELP,
    arg_required_else_help = true
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Attempts before giving up on incomplete sample frames
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_RETRIES)]
    retries: u32,

    /// Screenshot read timeout in milliseconds
    #[arg(long, global = true, value_name = "MS")]
    screenshot_timeout_ms: Option<u64>,

    /// Sample read timeout in milliseconds
    #[arg(long, global = true, value_name = "MS")]
    data_timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Capture the scope screen
    Screenshot {
        /// Output file, `-` for stdout
        #[arg(short, long, default_value = "screenshot.png")]
        output: PathBuf,

        /// Colormap file with 16 `r,g,b` lines
        #[arg(long)]
        colormap: Option<PathBuf>,

        /// Magnification factor (nearest neighbour)
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=MAX_MAGNIFY))]
        magnify: u32,

        /// Write the undecoded framebuffer instead of a PNG
        #[arg(long)]
        raw: bool,
    },

    /// Acquire both channels and print them as JSON
    Samples {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Convert a raw screenshot dump to PNG without a device
    Convert {
        /// Raw dump, `-` for stdin
        input: PathBuf,

        /// PNG output file
        output: PathBuf,

        /// Model the dump came from
        #[arg(long, default_value = "ut2025b", value_parser = parse_model)]
        model: DeviceModel,

        /// Colormap file with 16 `r,g,b` lines
        #[arg(long)]
        colormap: Option<PathBuf>,

        /// Magnification factor (nearest neighbour)
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=MAX_MAGNIFY))]
        magnify: u32,
    },

    /// List supported devices
    List,
}

fn parse_model(s: &str) -> Result<DeviceModel, String> {
    DeviceModel::from_name(s).ok_or_else(|| format!("unknown model '{}' (expected ut2025b, ut2102c or ut2052cel)", s))
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn acquisition_config(cli: &Cli) -> AcquisitionConfig {
    let mut config = AcquisitionConfig::default().with_max_retries(cli.retries);
    if let Some(ms) = cli.screenshot_timeout_ms {
        config = config.with_screenshot_timeout(Duration::from_millis(ms));
    }
    if let Some(ms) = cli.data_timeout_ms {
        config = config.with_data_timeout(Duration::from_millis(ms));
    }
    config
}

fn load_colormap(path: Option<&Path>) -> Result<Colormap, Box<dyn Error>> {
    match path {
        Some(p) => Ok(Colormap::parse(&fs::read_to_string(p)?)?),
        None => Ok(Colormap::default()),
    }
}

fn write_output(path: &Path, data: &[u8]) -> io::Result<()> {
    if path.as_os_str() == "-" {
        let mut stdout = io::stdout().lock();
        stdout.write_all(data)?;
        stdout.flush()
    } else {
        fs::write(path, data)
    }
}

fn save_png(image: ScreenshotImage, magnify: u32, path: &Path) -> Result<(), Box<dyn Error>> {
    let (width, height) = (image.width(), image.height());
    let rgb = RgbImage::from_raw(width, height, image.into_rgb_bytes())
        .ok_or("screenshot buffer does not match its dimensions")?;
    let rgb = if magnify > 1 {
        image::imageops::resize(&rgb, width * magnify, height * magnify, FilterType::Nearest)
    } else {
        rgb
    };

    let mut png = io::Cursor::new(Vec::new());
    rgb.write_to(&mut png, ImageFormat::Png)?;
    write_output(path, png.get_ref())?;
    Ok(())
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = acquisition_config(&cli);

    match cli.command {
        Command::Screenshot { output, colormap, magnify, raw } => {
            let colormap = load_colormap(colormap.as_deref())?;
            let mut device = Device::open(config)?;
            let model = device.model();

            let mut session = device.attach()?;
            let frame = session.get_raw_screenshot()?;
            session.detach()?;

            if raw {
                write_output(&output, &frame.into_bytes())?;
            } else {
                let image = decode_screenshot(&frame, model.config().screen_resolution, &colormap)?;
                save_png(image, magnify, &output)?;
            }
            log::info!("Screenshot written to {}", output.display());
        }
        Command::Samples { output } => {
            let mut device = Device::open(config)?;

            let mut session = device.attach()?;
            let (ch1, ch2) = session.get_samples()?;
            session.detach()?;

            let json = serde_json::to_string_pretty(&[ch1, ch2])?;
            match output {
                Some(path) => fs::write(path, json)?,
                None => println!("{}", json),
            }
        }
        Command::Convert { input, output, model, colormap, magnify } => {
            let colormap = load_colormap(colormap.as_deref())?;
            let data = if input.as_os_str() == "-" {
                let mut buf = Vec::new();
                io::stdin().lock().read_to_end(&mut buf)?;
                buf
            } else {
                fs::read(&input)?
            };

            let frame = RawFrame::new(FrameKind::Screenshot, data);
            let image = decode_screenshot(&frame, model.config().screen_resolution, &colormap)?;
            save_png(image, magnify, &output)?;
        }
        Command::List => {
            println!("SUPPORTED DEVICES:");
            for &(vid, pid, model) in SUPPORTED_DEVICES {
                let (w, h) = model.config().screen_resolution;
                println!("    {:<10}  {:04x}:{:04x}  {}x{}  {}", model.to_string(), vid, pid, w, h, model.config().name);
            }
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
