//! Instrumented stub engine shared by the integration tests

#![allow(dead_code)]

use diffusion_gateway::engine::{
    EngineError, GeneratedImage, GenerationEngine, GenerationRequest,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One recorded engine invocation
#[derive(Debug, Clone)]
pub struct Call {
    pub prompt: String,
    pub started: Instant,
    pub finished: Instant,
}

/// Observations shared between a test and its stub engine
#[derive(Clone, Default)]
pub struct Probe {
    calls: Arc<Mutex<Vec<Call>>>,
    invocations: Arc<AtomicUsize>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
}

impl Probe {
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst) > 0
    }

    /// Calls in the order they finished
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.prompt).collect()
    }
}

/// Engine returning a solid gray image after an optional delay
pub struct StubEngine {
    probe: Probe,
    delay: Duration,
    slow_prompts: Vec<(String, Duration)>,
    failing_prompts: Vec<String>,
}

impl StubEngine {
    pub fn new(probe: Probe) -> Self {
        Self {
            probe,
            delay: Duration::ZERO,
            slow_prompts: Vec::new(),
            failing_prompts: Vec::new(),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn slow_on(mut self, prompt: &str, delay: Duration) -> Self {
        self.slow_prompts.push((prompt.to_string(), delay));
        self
    }

    pub fn failing_on(mut self, prompt: &str) -> Self {
        self.failing_prompts.push(prompt.to_string());
        self
    }
}

impl GenerationEngine for StubEngine {
    fn name(&self) -> &str {
        "stub"
    }

    fn render(&mut self, request: &GenerationRequest) -> Result<GeneratedImage, EngineError> {
        self.probe.invocations.fetch_add(1, Ordering::SeqCst);
        let active = self.probe.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.probe.max_active.fetch_max(active, Ordering::SeqCst);
        let started = Instant::now();

        let delay = self
            .slow_prompts
            .iter()
            .find(|(prompt, _)| *prompt == request.prompt)
            .map(|(_, delay)| *delay)
            .unwrap_or(self.delay);
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        let result = if self.failing_prompts.contains(&request.prompt) {
            Err(EngineError::new(format!("stub failure for '{}'", request.prompt)))
        } else {
            let len = (request.width * request.height * 3) as usize;
            GeneratedImage::from_raw(request.width, request.height, vec![128; len])
                .ok_or_else(|| EngineError::new("bad buffer"))
        };

        self.probe.calls.lock().push(Call {
            prompt: request.prompt.clone(),
            started,
            finished: Instant::now(),
        });
        self.probe.active.fetch_sub(1, Ordering::SeqCst);

        result
    }
}

pub fn request(prompt: &str) -> GenerationRequest {
    GenerationRequest {
        prompt: prompt.to_string(),
        guidance_scale: 7.5,
        num_inference_steps: 1,
        height: 64,
        width: 64,
    }
}
