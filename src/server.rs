use std::sync::{Arc, Mutex};
use std::time::Duration;

use nng::{Aio, AioResult, Context, Protocol, Socket};
use tracing::{info, warn};

use crate::config::MapperConfig;
use crate::frame_loop::FrameLoop;
use crate::protocol::{FrameRequest, PoseReply};

pub type SharedFrameLoop = Arc<Mutex<FrameLoop>>;

/// REP socket that turns detector matrices into avatar poses, one request at a time.
pub struct PoseServer {
    // dropping the socket closes the listener
    _socket: Socket,
    _aio: Aio,
    frames: SharedFrameLoop,
    address: String,
}

impl PoseServer {
    pub fn bind(address: &str, config: MapperConfig) -> Result<Self, nng::Error> {
        let frames: SharedFrameLoop = Arc::new(Mutex::new(FrameLoop::new(config)));

        let socket = Socket::new(Protocol::Rep0)?;

        // the callback fires for every completed receive or send on this context
        let ctx = Context::new(&socket)?;
        let ctx_clone = ctx.clone();
        let frames_clone = frames.clone();
        let aio = Aio::new(move |aio, res| worker_callback(aio, &ctx_clone, res, &frames_clone))?;

        socket.listen(address)?;
        ctx.recv(&aio)?;

        info!("pose server listening on {}", address);

        Ok(Self {
            _socket: socket,
            _aio: aio,
            frames,
            address: address.to_string(),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn frames(&self) -> SharedFrameLoop {
        self.frames.clone()
    }

    /// Blocks the calling thread; requests are served from nng's worker threads.
    pub fn run(self) -> ! {
        loop {
            std::thread::sleep(Duration::from_millis(100));
        }
    }
}

/// Decodes one request, advances the frame loop and builds the reply.
pub fn handle_request(frames: &SharedFrameLoop, bytes: &[u8]) -> PoseReply {
    let request = match FrameRequest::from_bytes(bytes) {
        Ok(request) => request,
        Err(e) => {
            warn!("rejecting request: {}", e);
            return PoseReply::rejected();
        }
    };

    let mut frames = match frames.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };

    match frames.process(&request.to_detection()) {
        Ok(outcome) => PoseReply::from_outcome(&outcome),
        Err(e) => {
            warn!("rejecting frame at {} ms: {}", request.timestamp_ms, e);
            PoseReply::rejected()
        }
    }
}

fn worker_callback(aio: Aio, ctx: &Context, res: AioResult, frames: &SharedFrameLoop) {
    match res {
        AioResult::Recv(Ok(msg)) => {
            let reply = handle_request(frames, &msg);
            if let Err((_, e)) = ctx.send(&aio, reply.to_bytes()) {
                warn!("failed to queue pose reply: {}", e);
                recv_next(&aio, ctx);
            }
        }
        AioResult::Recv(Err(e)) => {
            warn!("receive failed: {}", e);
            recv_next(&aio, ctx);
        }
        AioResult::Send(res) => {
            if let Err((_, e)) = res {
                warn!("failed to send pose reply: {}", e);
            }
            recv_next(&aio, ctx);
        }
        AioResult::Sleep(_) => {}
    }
}

fn recv_next(aio: &Aio, ctx: &Context) {
    if let Err(e) = ctx.recv(aio) {
        warn!("could not wait for the next request: {}", e);
    }
}
