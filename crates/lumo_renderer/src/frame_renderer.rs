//! Renders whole frames on a pool of worker threads.

use std::sync::Arc;
use std::time::Instant;

use lumo_foundation::{AbortSwitch, JobManager, JobManagerFlags, JobQueue};
use parking_lot::Mutex;

use crate::{
    Frame, GenericTileRendererFactory, LightTracingSampleGeneratorFactory, RenderConfig,
    RenderError, RenderMode, Result, SampleGeneratorFactory, SampleGeneratorJob,
    SampleGeneratorVec, Scene, TileJob, TileRendererFactory, TileRendererVec,
};

/// Sample jobs scheduled per worker in light tracing mode, so faster
/// workers can pick up extra batches.
const PASSES_PER_THREAD: usize = 4;

/// Drives a [`JobManager`] over the jobs of one frame.
///
/// The abort switch is shared with every worker and job; raising it from
/// another thread makes [`render`] return early with whatever has been
/// rendered so far.
///
/// [`render`]: FrameRenderer::render
pub struct FrameRenderer {
    config: RenderConfig,
    abort_switch: AbortSwitch,
}

impl FrameRenderer {
    pub fn new(config: RenderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            abort_switch: AbortSwitch::new(),
        })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Switch that cancels the current render. It is cleared when a render
    /// starts.
    pub fn abort_switch(&self) -> &AbortSwitch {
        &self.abort_switch
    }

    /// Render `scene` into a new frame.
    pub fn render(&self, scene: Arc<Scene>) -> Result<Arc<Frame>> {
        let config = &self.config;
        let camera = scene.camera();
        if camera.image_width != config.width || camera.image_height != config.height {
            return Err(RenderError::ResolutionMismatch {
                camera_width: camera.image_width,
                camera_height: camera.image_height,
                frame_width: config.width,
                frame_height: config.height,
            });
        }

        let thread_count = config.resolved_thread_count();
        let frame = Arc::new(Frame::new(config.width, config.height, config.tile_size));
        let job_queue = Arc::new(JobQueue::new());

        let job_count = match config.mode {
            RenderMode::Tiled => self.schedule_tile_jobs(&scene, &frame, &job_queue, thread_count),
            RenderMode::LightTracing => {
                self.schedule_sample_jobs(&scene, &frame, &job_queue, thread_count)
            }
        };

        log::info!(
            "rendering {}x{} ({:?}, {} jobs) on {} threads",
            config.width,
            config.height,
            config.mode,
            job_count,
            thread_count
        );
        let start = Instant::now();

        let mut manager = JobManager::with_abort_switch(
            Arc::clone(&job_queue),
            thread_count,
            JobManagerFlags::empty(),
            self.abort_switch.clone(),
        )?;
        manager.start()?;
        let completed = manager.wait_until_completion_or_abort();
        manager.stop();

        let (succeeded, failed) = manager.job_totals();
        if !completed {
            let dropped = job_queue.clear_scheduled_jobs();
            log::info!(
                "render aborted after {:.2?}: {} jobs done, {} never started",
                start.elapsed(),
                succeeded + failed,
                dropped
            );
            return Ok(frame);
        }

        if config.mode == RenderMode::LightTracing {
            frame.develop_accumulation();
        }

        if failed > 0 {
            log::warn!("{} of {} jobs failed", failed, job_count);
        }
        log::info!("render finished in {:.2?}", start.elapsed());

        Ok(frame)
    }

    fn schedule_tile_jobs(
        &self,
        scene: &Arc<Scene>,
        frame: &Arc<Frame>,
        job_queue: &JobQueue,
        thread_count: usize,
    ) -> usize {
        let factory = GenericTileRendererFactory::new(
            Arc::clone(scene),
            self.config.seed,
            self.config.samples_per_pixel,
            self.config.background_color(),
        );
        let renderers: TileRendererVec = (0..thread_count)
            .map(|_| Mutex::new(factory.create()))
            .collect();

        let tiles = frame.tile_order();
        for &(tile_x, tile_y) in &tiles {
            job_queue.schedule(Box::new(TileJob::new(
                Arc::clone(&renderers),
                Arc::clone(frame),
                tile_x,
                tile_y,
                self.abort_switch.clone(),
            )));
        }
        tiles.len()
    }

    fn schedule_sample_jobs(
        &self,
        scene: &Arc<Scene>,
        frame: &Arc<Frame>,
        job_queue: &JobQueue,
        thread_count: usize,
    ) -> usize {
        let factory = LightTracingSampleGeneratorFactory::new(Arc::clone(scene), self.config.seed);
        let generators: SampleGeneratorVec = (0..thread_count)
            .map(|index| Mutex::new(factory.create(index, thread_count)))
            .collect();

        let job_count = thread_count * PASSES_PER_THREAD;
        let total = self.config.light_samples;
        for index in 0..job_count {
            // Spread the remainder over the first jobs
            let count = total / job_count + usize::from(index < total % job_count);
            job_queue.schedule(Box::new(SampleGeneratorJob::new(
                Arc::clone(&generators),
                Arc::clone(frame),
                count,
                self.abort_switch.clone(),
            )));
        }
        job_count
    }
}
