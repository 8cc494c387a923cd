use anyhow::{bail, Context, Result};
use clap::Parser;
use facetrace_core::{load_texture, Mesh, Texture};
use facetrace_math::{Quat, Vec2};
use facetrace_renderer::{
    controls, save_buffers, save_display_png, BufferMode, DisplaySettings, RenderConfig,
    RenderController, RenderError, Renderer, DEFAULT_POLL_INTERVAL,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Render a textured mesh into G-buffer planes and save them as PNGs.
#[derive(Parser, Debug)]
#[command(name = "facetrace_viewer", version)]
struct Args {
    /// Triangle mesh to render (OBJ)
    #[arg(short, long)]
    mesh: PathBuf,

    /// Albedo texture; without one the diffuse and color planes stay black
    #[arg(short, long)]
    texture: Option<PathBuf>,

    /// JSON render config; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// Vertical field of view in degrees
    #[arg(long)]
    fov: Option<f32>,

    #[arg(long)]
    max_passes: Option<u32>,

    /// Start from the default camera before applying the moves below
    #[arg(long)]
    reset_camera: bool,

    /// Trackball yaw in degrees
    #[arg(long, default_value_t = 0.0)]
    yaw: f32,

    /// Trackball pitch in degrees
    #[arg(long, default_value_t = 0.0)]
    pitch: f32,

    /// Trackball drag in normalized screen coordinates: x0,y0,x1,y1
    #[arg(long, value_parser = parse_floats::<4>)]
    drag: Option<[f32; 4]>,

    /// Pan by pointer motion: dx,dy
    #[arg(long, value_parser = parse_floats::<2>, allow_hyphen_values = true)]
    pan: Option<[f32; 2]>,

    /// Dolly by pointer motion
    #[arg(long, allow_hyphen_values = true)]
    dolly: Option<f32>,

    /// Also write display_<plane>.png for these planes
    #[arg(long = "mode", value_parser = parse_mode)]
    modes: Vec<BufferMode>,

    /// JSON display settings; the flags below override it
    #[arg(long)]
    display: Option<PathBuf>,

    /// Depth mapped to black and white: near,far
    #[arg(long, value_parser = parse_floats::<2>)]
    depth_range: Option<[f32; 2]>,

    /// Show depth through a blue-green-red ramp
    #[arg(long)]
    pseudo_color: bool,

    /// Output directory for the PNGs
    #[arg(short, long, default_value = ".")]
    out: PathBuf,

    /// Worker threads, 0 for one per core
    #[arg(long, default_value_t = 0)]
    threads: usize,

    /// Give up if the passes take longer than this many seconds
    #[arg(long, default_value_t = 300)]
    timeout: u64,
}

fn parse_floats<const N: usize>(s: &str) -> Result<[f32; N], String> {
    let values = s
        .split(',')
        .map(|v| v.trim().parse::<f32>().map_err(|e| format!("'{v}': {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    values
        .try_into()
        .map_err(|values: Vec<f32>| format!("expected {N} comma-separated numbers, got {}", values.len()))
}

fn parse_mode(s: &str) -> Result<BufferMode, String> {
    s.parse().map_err(|e: RenderError| e.to_string())
}

impl Args {
    /// Config and orientation after file, overrides and camera moves.
    fn camera(&self) -> Result<(RenderConfig, Quat)> {
        let mut config = match &self.config {
            Some(path) => RenderConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => RenderConfig::default(),
        };
        let mut orientation = Quat::IDENTITY;

        if self.reset_camera {
            controls::reset(&mut config, &mut orientation);
        }
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(fov) = self.fov {
            config.fov = fov;
        }
        if let Some(max_passes) = self.max_passes {
            config.max_passes = max_passes;
        }

        orientation = controls::rotate(orientation, Quat::from_rotation_y(self.yaw.to_radians()));
        orientation = controls::rotate(orientation, Quat::from_rotation_x(self.pitch.to_radians()));
        if let Some([x0, y0, x1, y1]) = self.drag {
            let delta = controls::trackball(Vec2::new(x0, y0), Vec2::new(x1, y1));
            orientation = controls::rotate(orientation, delta);
        }
        if let Some([dx, dy]) = self.pan {
            controls::pan(&mut config, dx, dy);
        }
        if let Some(dy) = self.dolly {
            controls::dolly(&mut config, dy);
        }

        config.validate()?;
        Ok((config, orientation))
    }

    fn display_settings(&self) -> Result<DisplaySettings> {
        let mut settings = match &self.display {
            Some(path) => DisplaySettings::load(path)
                .with_context(|| format!("Failed to load display settings {}", path.display()))?,
            None => DisplaySettings::default(),
        };
        if let Some(range) = self.depth_range {
            settings.depth_range = range;
        }
        if self.pseudo_color {
            settings.pseudo_color = true;
        }
        Ok(settings)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = Args::parse();
    let (config, orientation) = args.camera()?;
    let display = args.display_settings()?;
    let max_passes = config.max_passes;

    let mesh = Mesh::load_obj(&args.mesh)
        .with_context(|| format!("Failed to load mesh {}", args.mesh.display()))?;
    let texture = match &args.texture {
        Some(path) => load_texture(path)
            .with_context(|| format!("Failed to load texture {}", path.display()))?,
        None => Texture::empty(),
    };

    let mut renderer = if args.threads == 0 {
        Renderer::new()?
    } else {
        Renderer::with_threads(args.threads)?
    };
    log::info!("Rendering {}x{} with {} workers", config.width, config.height, renderer.num_threads());

    renderer.set_mesh(Arc::new(mesh));
    renderer.set_texture(Arc::new(texture));
    renderer.build_accelerator()?;

    let controller = RenderController::spawn(renderer, config, DEFAULT_POLL_INTERVAL)?;
    controller.with_state(|state| state.orientation = orientation);

    let start = Instant::now();
    let passes = controller.refine(Duration::from_secs(args.timeout));
    if passes < max_passes {
        controller.shutdown();
        bail!("Rendering stopped after {passes} of {max_passes} passes");
    }
    log::info!("{passes} passes in {:.2}s", start.elapsed().as_secs_f64());

    let written = controller.with_state(|state| -> Result<Vec<PathBuf>> {
        let mut written = save_buffers(&args.out, &state.buffer)?;
        for &mode in &args.modes {
            written.push(save_display_png(&args.out, &state.buffer, mode, &display)?);
        }
        Ok(written)
    })?;
    println!("Wrote {} images to {}", written.len(), args.out.display());

    controller.shutdown();
    Ok(())
}
