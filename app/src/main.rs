use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use clap::Parser;
use env_logger::Builder;
use log::LevelFilter;
use nalgebra::{Matrix4, Vector3};
use thiserror::Error;

use pcd_core::checkpoint::{CheckpointHook, NoCheckpoints};
use pcd_core::geometry::Polygon;
use pcd_core::pointcloud::point::{PointCloud, Srs};
use pcd_core::pointcloud::transform::{flip_about_x, scale_linear};
use pcd_core::PcdError;
use pcd_parser::parsers::csv::load_csv_polygon;
use pcd_parser::parsers::load;
use pcd_parser::writers::las::save_las;
use pcd_parser::ParseError;
use pcd_registration::{
    is_upside_down_from_file, upright_rotation, OffsetScaleFitter, ParamsError, Registrar,
    RegistrationParams, RegistrationRecord, UpVector,
};

#[derive(Parser, Debug)]
#[command(
    name = "pregister",
    about = "Registers an object point cloud onto a drive map and its footprint",
    version = "0.0.1"
)]
struct Cli {
    /// Object point cloud (LAS/LAZ/CSV)
    source: PathBuf,

    /// Drive map point cloud the object is placed in
    drivemap: PathBuf,

    /// Footprint polygon of the object (CSV)
    footprint: PathBuf,

    /// Output LAS file
    output: PathBuf,

    /// Random downsampling fraction applied before the object boundary search
    /// [default: 0.1, or the parameter file's value]
    #[arg(short = 'd', long)]
    downsample: Option<f64>,

    /// Spacing of the resampled object boundary
    /// [default: 0.05, or the parameter file's value]
    #[arg(short = 'v', long)]
    voxel: Option<f64>,

    /// Initial scale override
    #[arg(short = 's', long)]
    scale: Option<f64>,

    /// Do not trust the up vector, check the result against it instead
    #[arg(short = 'U', long)]
    distrust_up: bool,

    /// JSON file with the up vector relative to the source
    #[arg(short = 'u', long, value_name = "JSON")]
    up_file: Option<PathBuf>,

    /// JSON file overriding registration parameters
    #[arg(long, value_name = "JSON")]
    params: Option<PathBuf>,

    /// Directory receiving intermediate clouds
    #[arg(long, value_name = "DIR")]
    checkpoints: Option<PathBuf>,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, default_value = "EPSG:32633")]
    srs: String,

    #[arg(long)]
    verbose: bool,
}

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Registration(#[from] PcdError),

    #[error(transparent)]
    Params(#[from] ParamsError),

    #[error("failed to create checkpoint directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("registration failed: {0}")]
    Failed(String),
}

/// Writes every checkpoint as `<name>.las` into a directory.
struct LasCheckpoints {
    dir: PathBuf,
}

impl CheckpointHook for LasCheckpoints {
    fn checkpoint(&mut self, name: &str, point_cloud: &PointCloud) {
        let path = self.dir.join(format!("{name}.las"));
        match save_las(point_cloud, &path) {
            Ok(()) => log::info!("checkpoint {name}: {} points to {path:?}", point_cloud.len()),
            Err(err) => log::warn!("checkpoint {name} not written: {err}"),
        }
    }
}

fn read_up_vector(path: Option<&Path>) -> Option<UpVector> {
    let path = path?;
    match UpVector::from_path(path) {
        Ok(up) => {
            log::info!("up vector {:?} from {path:?}", up.estimated_up_direction);
            Some(up)
        }
        Err(err) => {
            log::warn!("cannot parse up file, skipping: {err}");
            None
        }
    }
}

/// Rotates the source upright and applies the initial scale override.
fn initial_registration(source: &mut PointCloud, up: Option<&UpVector>, scale: Option<f64>) {
    if let Some(up) = up {
        log::info!("rotating source upright");
        source.transform(&upright_rotation(up));
    }
    if let Some(scale) = scale {
        log::info!("initial scale {scale}");
        source.scale(scale);
        if let Some(registration) = source.metadata.registration.as_mut() {
            registration.precision *= scale;
        }
    }
}

/// Turns a registered source upside down and moves it back onto the
/// reference. The flip keeps the x extent, so the refit only moves the offset.
fn flip_and_refit(
    source: &mut PointCloud,
    mut proxy: PointCloud,
    record: &RegistrationRecord,
    ref_points: &[Vector3<f64>],
    ref_offset: &Vector3<f64>,
) -> Result<(), PcdError> {
    let flip = flip_about_x();
    proxy.transform(&(flip * record.transform));
    proxy.copy_registration_from(source);

    let (_, scale) = OffsetScaleFitter.fit(&mut proxy, ref_points, ref_offset)?;
    let mut transform: Matrix4<f64> = flip;
    scale_linear(&mut transform, scale);
    source.transform(&transform);
    source.copy_registration_from(&proxy);
    Ok(())
}

fn coarse_registration(
    registrar: &mut Registrar,
    source: &mut PointCloud,
    drivemap: &PointCloud,
    footprint: &Polygon,
    args: &Cli,
    hook: &mut dyn CheckpointHook,
) -> Result<(), AppError> {
    let params = registrar.params().clone();

    let band = registrar
        .boundaries()
        .by_polygon_band(drivemap, footprint, &params.drivemap_band)?;
    let (ref_points, ref_offset) = if band.is_empty() {
        log::warn!("no drivemap points around the footprint, using the footprint itself");
        (footprint.vertices().to_vec(), Vector3::zeros())
    } else {
        (band.positions(), drivemap.offset())
    };

    let proxy = registrar
        .boundaries()
        .boundary_of_center_object(source, &params.center_object, hook)
        .map_err(|err| {
            if err.is_data_degeneracy() {
                AppError::Failed(err.to_string())
            } else {
                AppError::Registration(err)
            }
        })?;

    let record = registrar
        .register_with_proxy(source, proxy.clone(), &ref_points, &ref_offset)?
        .ok_or_else(|| AppError::Failed("object boundary does not fit the reference".into()))?;
    log::info!(
        "coarse registration: scale {:.6}, offset {:?}",
        record.scale,
        record.offset
    );

    if args.distrust_up && is_upside_down_from_file(args.up_file.as_deref(), &record.transform) {
        log::info!("result is upside down, flipping");
        flip_and_refit(source, proxy, &record, &ref_points, &ref_offset)?;
    }
    Ok(())
}

const DEFAULT_DOWNSAMPLE: f64 = 0.1;
const DEFAULT_VOXEL: f64 = 0.05;

/// Registration parameters: built-in defaults, then the parameter file, then
/// the flags given on the command line.
fn resolve_params(args: &Cli) -> Result<RegistrationParams, AppError> {
    let mut params = match &args.params {
        Some(path) => RegistrationParams::from_json_path(path)?,
        None => {
            let mut params = RegistrationParams::default();
            params.center_object.downsample = Some(DEFAULT_DOWNSAMPLE);
            params.center_object.voxel_size = DEFAULT_VOXEL;
            params
        }
    };
    let center_object = &mut params.center_object;
    if let Some(downsample) = args.downsample {
        center_object.downsample = Some(downsample);
    }
    if let Some(voxel) = args.voxel {
        center_object.voxel_size = voxel;
    }
    center_object.seed = args.seed.or(center_object.seed);
    Ok(params)
}

fn run(args: &Cli) -> Result<(), AppError> {
    let params = resolve_params(args)?;

    let mut hook: Box<dyn CheckpointHook> = match &args.checkpoints {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            Box::new(LasCheckpoints { dir: dir.clone() })
        }
        None => Box::new(NoCheckpoints),
    };
    let srs = Srs(args.srs.clone());

    log::info!("reading drivemap {:?}", args.drivemap);
    let mut drivemap = load(&args.drivemap)?;
    drivemap.force_srs(srs.clone());

    log::info!("reading footprint {:?}", args.footprint);
    let footprint = load_csv_polygon(&args.footprint)?;

    log::info!("reading object {:?}", args.source);
    let mut source = load(&args.source)?;

    let up = read_up_vector(args.up_file.as_deref());
    let trusted_up = up.filter(|_| !args.distrust_up);
    initial_registration(&mut source, trusted_up.as_ref(), args.scale);
    hook.checkpoint("initial", &source);

    let mut registrar = Registrar::new(params);
    coarse_registration(
        &mut registrar,
        &mut source,
        &drivemap,
        &footprint,
        args,
        hook.as_mut(),
    )?;
    hook.checkpoint("coarse", &source);

    source.force_srs(srs);
    save_las(&source, &args.output)?;
    log::info!("wrote {} points to {:?}", source.len(), args.output);
    Ok(())
}

fn main() {
    let args = Cli::parse();

    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(
            None,
            if args.verbose {
                LevelFilter::Debug
            } else {
                LevelFilter::Info
            },
        )
        .init();

    let start = std::time::Instant::now();
    if let Err(err) = run(&args) {
        log::error!("{err}");
        std::process::exit(1);
    }
    log::info!("Elapsed: {:?}", start.elapsed());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults() {
        let cli = Cli::parse_from(["pregister", "obj.las", "map.las", "fp.csv", "out.las"]);
        assert_eq!(cli.downsample, None);
        assert_eq!(cli.voxel, None);
        assert_eq!(cli.srs, "EPSG:32633");
        assert!(!cli.distrust_up);
        assert!(cli.scale.is_none());
    }

    #[test]
    fn cli_short_flags() {
        let cli = Cli::parse_from([
            "pregister", "obj.las", "map.las", "fp.csv", "out.las", "-d", "0.5", "-v", "0.2",
            "-s", "1.5", "-U", "-u", "up.json",
        ]);
        assert_eq!(cli.downsample, Some(0.5));
        assert_eq!(cli.voxel, Some(0.2));
        assert_eq!(cli.scale, Some(1.5));
        assert!(cli.distrust_up);
        assert_eq!(cli.up_file, Some(PathBuf::from("up.json")));
    }

    #[test]
    fn params_without_file_use_cli_defaults() {
        let cli = Cli::parse_from(["pregister", "obj.las", "map.las", "fp.csv", "out.las"]);
        let params = resolve_params(&cli).unwrap();
        assert_eq!(params.center_object.downsample, Some(DEFAULT_DOWNSAMPLE));
        assert_eq!(params.center_object.voxel_size, DEFAULT_VOXEL);
    }

    #[test]
    fn params_file_values_survive_unless_flagged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        std::fs::write(
            &path,
            r#"{"center_object": {"downsample": 0.3, "voxel_size": 0.2, "seed": 7}}"#,
        )
        .unwrap();
        let params_arg = path.to_str().unwrap();

        let cli = Cli::parse_from([
            "pregister", "obj.las", "map.las", "fp.csv", "out.las", "--params", params_arg,
        ]);
        let params = resolve_params(&cli).unwrap();
        assert_eq!(params.center_object.downsample, Some(0.3));
        assert_eq!(params.center_object.voxel_size, 0.2);
        assert_eq!(params.center_object.seed, Some(7));

        let cli = Cli::parse_from([
            "pregister", "obj.las", "map.las", "fp.csv", "out.las", "--params", params_arg, "-v",
            "0.08", "--seed", "3",
        ]);
        let params = resolve_params(&cli).unwrap();
        assert_eq!(params.center_object.downsample, Some(0.3));
        assert_eq!(params.center_object.voxel_size, 0.08);
        assert_eq!(params.center_object.seed, Some(3));
    }

    #[test]
    fn initial_scale_updates_precision() {
        let mut pc = PointCloud::from_xyz([[1.0, 2.0, 3.0]]);
        pc.register(Vector3::new(10.0, 0.0, 0.0), 0.01);
        initial_registration(&mut pc, None, Some(2.0));
        assert_eq!(pc.points[0].position(), Vector3::new(2.0, 4.0, 6.0));
        assert!((pc.precision() - 0.02).abs() < 1e-15);
    }

    #[test]
    fn trusted_up_vector_rotates_upright() {
        let mut pc = PointCloud::from_xyz([[0.0, 0.0, 1.0]]);
        let up = UpVector::new(Vector3::new(0.0, 0.0, -1.0));
        initial_registration(&mut pc, Some(&up), None);
        assert!((pc.points[0].position() - Vector3::new(0.0, 0.0, -1.0)).norm() < 1e-12);
    }
}
