use crate::build_info;
use crate::domain::*;
use crate::error::{Result, WaveError};
use crate::initial_conditions::*;
use crate::io::*;
use crate::linear::*;
use crate::mesh::CartesianMesh;
use crate::par_slice::ExecutionPolicy;
use crate::time::*;
use crate::util::*;
use clap::Parser;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[cfg(feature = "profile-with-puffin")]
use std::sync::Mutex;

#[cfg(feature = "profile-with-puffin")]
static PUFFIN_SERVER: Mutex<Option<puffin_http::Server>> = Mutex::new(None);

/// INFO to stdout, DEBUG with `--verbose`.
pub fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let _ = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_level(true)
        .try_init();
}

/// Implicit finite-volume solver for the scalar wave equation
/// `d2h/dt2 = div(C^2 grad h)` on a Cartesian box.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Number of grid dimensions, 1 to 3.
    #[arg(long, default_value = "2", value_parser = clap::value_parser!(u8).range(1..=3))]
    pub dimension: u8,

    /// Cells along each dimension.
    #[arg(short = 'n', long, default_value = "64")]
    pub cells: usize,

    /// Domain length along each dimension.
    #[arg(short = 'l', long, default_value = "1.0")]
    pub length: f64,

    /// Uniform wave speed C.
    #[arg(long, default_value = "1.0")]
    pub wave_speed: f64,

    /// Time step, the first step when --max-courant is given.
    #[arg(long, default_value = "0.01")]
    pub delta_t: f64,

    #[arg(long, default_value = "0.0")]
    pub start_time: f64,

    #[arg(long, default_value = "1.0")]
    pub end_time: f64,

    /// Absolute solver tolerance on the normalised residual.
    #[arg(long, default_value = "1e-8")]
    pub tolerance: f64,

    /// Solver tolerance relative to the initial residual, 0 disables it.
    #[arg(long, default_value = "0.0")]
    pub rel_tol: f64,

    #[arg(long, default_value = "1000")]
    pub max_iterations: usize,

    #[arg(long, default_value = "diagonal")]
    pub preconditioner: Preconditioner,

    /// When checkpoints are written.
    #[arg(long, default_value = "time-step")]
    pub write_control: ClapWriteControl,

    /// Steps, simulated seconds or wall clock seconds between writes,
    /// depending on --write-control.
    #[arg(long, default_value = "10")]
    pub write_interval: f64,

    /// Keep only this many newest checkpoints, 0 keeps all.
    #[arg(long, default_value = "0")]
    pub purge_write: usize,

    /// Choose the time step from this Courant number.
    #[arg(long)]
    pub max_courant: Option<f64>,

    /// Upper limit for adaptive time steps.
    #[arg(long, requires("max_courant"))]
    pub max_delta_t: Option<f64>,

    /// Face interpolation of C^2.
    #[arg(long, default_value = "linear")]
    pub scheme: String,

    /// Condition on every side of the box.
    #[arg(long, default_value = "zero-gradient")]
    pub boundary: ClapPatchType,

    /// Face value for fixed-value boundaries.
    #[arg(long, default_value = "0.0")]
    pub boundary_value: f64,

    #[arg(long, default_value = "impulse")]
    pub initial_condition: ClapICType,

    /// Gaussian width is cells / variance.
    #[arg(long, default_value = "8.0")]
    pub ic_variance: f64,

    /// Amplitude of the random initial condition.
    #[arg(long, default_value = "1.0")]
    pub ic_amplitude: f64,

    /// Seed of the random initial condition.
    #[arg(long, default_value = "0")]
    pub seed: u64,

    /// The number of threads to use.
    #[arg(short, long, default_value = "8")]
    pub threads: usize,

    /// Chunk size to use for parallelism, 0 runs serially.
    #[arg(short, long, default_value = "1000")]
    pub chunk_size: usize,

    /// Directory for checkpoints and output files, will be created.
    /// WARNING, unless resuming, current contents will be removed.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Continue from the latest checkpoint in the output directory.
    #[arg(long, requires("output_dir"))]
    pub resume: bool,

    #[arg(long, requires("output_dir"))]
    pub write_vtk: bool,

    #[arg(long, requires("output_dir"))]
    pub write_images: bool,

    #[arg(long, requires("output_dir"))]
    pub write_csv: bool,

    /// Log solver details.
    #[arg(short, long)]
    pub verbose: bool,

    /// Print build information and quit
    #[arg(long)]
    pub build_info: bool,
}

impl Args {
    pub fn cli_setup(name: &str) -> Result<Self> {
        let args = Args::parse();

        if args.build_info {
            build_info::print_report(name);
            std::process::exit(0);
        }

        init_logging(args.verbose);

        if let Some(output_dir) = &args.output_dir {
            if !args.resume {
                let _ = std::fs::remove_dir_all(output_dir);
            }
            std::fs::create_dir_all(output_dir)?;
        }

        #[cfg(feature = "profile-with-puffin")]
        {
            let server_addr = format!("127.0.0.1:{}", puffin_http::DEFAULT_PORT);
            tracing::info!(
                "Run this to view profiling data:  puffin_viewer {server_addr}"
            );
            let server = puffin_http::Server::new(&server_addr)
                .map_err(|e| WaveError::invalid(format!("profiler: {e}")))?;
            if let Ok(mut lock) = PUFFIN_SERVER.lock() {
                *lock = Some(server);
            }
            profiling::puffin::set_scopes_on(true);
        }

        rayon::ThreadPoolBuilder::new()
            .num_threads(args.threads)
            .thread_name(|i| format!("rayon_thread_{}", i))
            .build_global()
            .map_err(|e| WaveError::invalid(format!("thread pool: {e}")))?;

        Ok(args)
    }

    pub fn execution_policy(&self) -> ExecutionPolicy {
        ExecutionPolicy::from_chunk_size((self.chunk_size > 0).then_some(self.chunk_size))
    }

    pub fn solver_controls(&self) -> SolverControls {
        SolverControls {
            tolerance: self.tolerance,
            rel_tol: self.rel_tol,
            max_iterations: self.max_iterations,
            preconditioner: self.preconditioner,
        }
    }

    pub fn run_controls(&self) -> Result<RunControls> {
        let time_step = match self.max_courant {
            Some(max_courant) => TimeStepPolicy::Adaptive {
                max_courant,
                max_delta_t: self.max_delta_t.unwrap_or(f64::MAX),
            },
            None => TimeStepPolicy::Fixed,
        };
        let controls = RunControls {
            start_time: self.start_time,
            end_time: self.end_time,
            delta_t: self.delta_t,
            time_step,
            write: WritePolicy {
                control: self.write_control.to_write_control(self.write_interval)?,
                purge_write: self.purge_write,
                write_at_end: true,
            },
        };
        controls.validate()?;
        Ok(controls)
    }

    pub fn ic_type(&self) -> ICType {
        let dial = match self.initial_condition {
            ClapICType::Rand => self.ic_amplitude,
            _ => self.ic_variance,
        };
        self.initial_condition.to_ic_type(dial, self.seed)
    }

    pub fn mesh<const GRID_DIMENSION: usize>(
        &self,
    ) -> Result<CartesianMesh<GRID_DIMENSION>> {
        CartesianMesh::new(
            [self.cells; GRID_DIMENSION],
            Extent::repeat(self.length),
        )
    }

    pub fn boundary_conditions<const GRID_DIMENSION: usize>(
        &self,
    ) -> BoundaryConditions<GRID_DIMENSION> {
        BoundaryConditions::uniform(self.boundary.to_patch_condition(self.boundary_value))
    }

    pub fn case<const GRID_DIMENSION: usize>(&self) -> Result<WaveCase<GRID_DIMENSION>> {
        let mesh = self.mesh()?;
        let policy = self.execution_policy();
        let mut initial = OwnedDomain::new(*mesh.aabb());
        generate_ic(&mut initial, self.ic_type(), policy.chunk_size(mesh.n_cells()));
        let case = WaveCase::uniform_speed(mesh, initial, self.wave_speed)
            .with_bcs(self.boundary_conditions())
            .with_scheme(&self.scheme)
            .with_policy(policy);
        case.validate()?;
        Ok(case)
    }

    fn output_path(&self, sub_dir: &str) -> Option<PathBuf> {
        self.output_dir.as_ref().map(|dir| dir.join(sub_dir))
    }

    fn store<const GRID_DIMENSION: usize>(
        &self,
    ) -> Result<Box<dyn CheckpointStore<GRID_DIMENSION>>> {
        Ok(match &self.output_dir {
            Some(dir) => Box::new(DirectoryStore::new(dir, SOLVED_FIELD)?),
            // without a directory only the newest is kept
            None => Box::new(MemoryStore::with_retention(1)),
        })
    }

    fn writers<const GRID_DIMENSION: usize>(
        &self,
    ) -> Result<Vec<Box<dyn FieldWriter<GRID_DIMENSION>>>> {
        let mut writers: Vec<Box<dyn FieldWriter<GRID_DIMENSION>>> = Vec::new();
        if self.write_vtk {
            if let Some(dir) = self.output_path("VTK") {
                writers.push(Box::new(VtkWriter::new(dir)?));
            }
        }
        if self.write_images {
            if let Some(dir) = self.output_path("images") {
                writers.push(Box::new(ImageWriter::new(dir, ColourRange::default())?));
            }
        }
        if self.write_csv {
            if let Some(dir) = self.output_path("postProcessing") {
                writers.push(Box::new(CsvWriter::new(dir)?));
            }
        }
        Ok(writers)
    }

    /// Build the time loop for a fresh or resumed run.
    pub fn time_loop<const GRID_DIMENSION: usize>(
        &self,
    ) -> Result<TimeLoop<GRID_DIMENSION>> {
        let case = self.case::<GRID_DIMENSION>()?;
        let controls = self.run_controls()?;
        let solver = Box::new(Pcg::new(self.solver_controls(), self.execution_policy())?);
        let store = self.store::<GRID_DIMENSION>()?;

        let mut time_loop = if self.resume {
            let checkpoint = store.latest()?.ok_or_else(|| {
                WaveError::Checkpoint(format!(
                    "no checkpoint to resume from in {:?}",
                    self.output_dir
                ))
            })?;
            TimeLoop::resume(case, checkpoint, controls, solver, store)?
        } else {
            TimeLoop::new(case, controls, solver, store)?
        };
        for writer in self.writers::<GRID_DIMENSION>()? {
            time_loop = time_loop.with_writer(writer);
        }
        Ok(time_loop)
    }

    pub fn run<const GRID_DIMENSION: usize>(&self) -> Result<RunSummary> {
        tracing::info!("Starting {}D run, {} cells per side", GRID_DIMENSION, self.cells);
        let mut time_loop = self.time_loop::<GRID_DIMENSION>()?;
        time_loop.run()
    }

    /// Dispatch on `--dimension`.
    pub fn run_dimension(&self) -> Result<RunSummary> {
        match self.dimension {
            1 => self.run::<1>(),
            2 => self.run::<2>(),
            3 => self.run::<3>(),
            d => Err(WaveError::invalid(format!("unsupported dimension {d}"))),
        }
    }

    pub fn finish(&self) {
        profiling::finish_frame!();

        #[cfg(feature = "profile-with-puffin")]
        {
            tracing::info!("Flushing profiler");
            if let Ok(mut lock) = PUFFIN_SERVER.lock() {
                lock.take();
            }
        }
    }
}
