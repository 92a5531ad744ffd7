// Streams a synthetic head motion to a running pose server and logs the replies.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use nalgebra::Vector3;
use nng::{Protocol, Socket};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use facepuppet::face_transform::{compose, DecomposedTransform, EulerZyx};
use facepuppet::protocol::{FrameRequest, PoseReply};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "tcp://127.0.0.1:54321")]
    address: String,

    /// Number of frames to send
    #[arg(short, long, default_value_t = 300)]
    frames: u32,

    /// Frames per second
    #[arg(long, default_value_t = 30)]
    fps: u32,
}

// head turning left and right while swaying, roughly 50 cm from the camera
fn synthetic_head(t: f32) -> [f32; 16] {
    let transform = DecomposedTransform {
        translation: Vector3::new(5.0 * (0.5 * t).sin(), 2.0 * t.cos(), -50.0 + 10.0 * (0.3 * t).sin()),
        rotation: EulerZyx::new(0.1 * t.sin(), 0.6 * (0.8 * t).sin(), 0.05 * t.cos()),
        scale: Vector3::repeat(1.0),
        degeneracy: None,
    };

    let mut values = [0.0; 16];
    values.copy_from_slice(compose(&transform).as_slice());
    values
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let s = Socket::new(Protocol::Req0)?;
    s.dial(&args.address)
        .with_context(|| format!("failed to dial {}", args.address))?;

    let frame_time = Duration::from_secs_f32(1.0 / args.fps.max(1) as f32);
    let start = Instant::now();

    for _ in 0..args.frames {
        let elapsed = start.elapsed();
        let request = FrameRequest::new(
            elapsed.as_millis() as u64,
            synthetic_head(elapsed.as_secs_f32()),
        );

        s.send(request.to_bytes()).map_err(|(_, e)| e)?;
        let msg = s.recv()?;

        match PoseReply::from_bytes(&msg) {
            Ok(reply) => info!(
                "{:?} position {:?} orientation {:?} scale {:.3}",
                reply.status(),
                reply.position,
                reply.orientation,
                reply.scale
            ),
            Err(e) => warn!("bad reply: {}", e),
        }

        std::thread::sleep(frame_time);
    }

    Ok(())
}
