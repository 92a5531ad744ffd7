use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use facepuppet::avatar::AvatarPoseMapper;
use facepuppet::config::Config;
use facepuppet::face_transform::{decompose, AffineMatrix};
use facepuppet::recording::{replay, Recording};
use facepuppet::server::PoseServer;

#[derive(Parser, Debug)]
#[command(author, version, about = "Drive an avatar from face tracking transforms", long_about = None)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, default_value = "facepuppet.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decompose one 4x4 matrix and print the resulting avatar pose
    Decompose {
        /// 16 matrix elements, column-major unless --row-major is given
        #[arg(num_args = 16, allow_negative_numbers = true, required = true)]
        values: Vec<f32>,

        #[arg(long)]
        row_major: bool,
    },
    /// Replay a recorded .npy matrix sequence
    Replay {
        input: PathBuf,

        /// Write the pose table (N x 8) here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Serve poses over nng
    Serve {
        /// Overrides the configured listen address
        #[arg(short, long)]
        address: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = Config::load_or_default(&args.config);

    match args.command {
        Command::Decompose { values, row_major } => {
            let affine = if row_major {
                AffineMatrix::from_row_major(&values)?
            } else {
                AffineMatrix::from_column_major(&values)?
            };
            let transform = decompose(&affine);

            println!("translation: {:?}", transform.translation.as_slice());
            println!(
                "rotation (zyx, rad): [{}, {}, {}]",
                transform.rotation.x, transform.rotation.y, transform.rotation.z
            );
            println!("scale: {:?}", transform.scale.as_slice());
            if let Some(reason) = transform.degeneracy {
                println!("degenerate: {:?}", reason);
            }

            let mapper = AvatarPoseMapper::new(config.mapper.clone());
            match mapper.target(&transform, config.mapper.mirror) {
                Some(pose) => println!("pose: {:?}", pose.to_array()),
                None => println!("pose: none, the frame would be held"),
            }
        }
        Command::Replay { input, output } => {
            let recording = Recording::load(&input, &config.replay)
                .with_context(|| format!("failed to load {}", input.display()))?;
            info!("loaded {} frames from {}", recording.len(), input.display());

            let result = replay(&recording, &config.mapper)?;

            if let Some(output) = output {
                result
                    .save(&output)
                    .with_context(|| format!("failed to write {}", output.display()))?;
                info!("wrote {} poses to {}", result.poses.len(), output.display());
            }
        }
        Command::Serve { address } => {
            let address = address.unwrap_or_else(|| config.server.address.clone());
            let server = PoseServer::bind(&address, config.mapper.clone())
                .with_context(|| format!("failed to listen on {}", address))?;
            server.run();
        }
    }

    Ok(())
}
