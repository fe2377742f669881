//! Jobs scheduled by the frame renderer.
//!
//! Renderers and generators are created once per worker and looked up by
//! the executing worker's index, so each lock below is only ever taken by
//! one thread.

use std::sync::Arc;

use lumo_foundation::{AbortSwitch, Job, JobError};
use parking_lot::Mutex;

use crate::{Frame, SampleGenerator, TileRenderer};

pub type TileRendererVec = Arc<[Mutex<Box<dyn TileRenderer>>]>;
pub type SampleGeneratorVec = Arc<[Mutex<Box<dyn SampleGenerator>>]>;

fn missing_worker_state(kind: &str, worker_index: usize, available: usize) -> JobError {
    JobError::descriptive(
        format!("no {} for worker", kind),
        format!("worker {} but only {} were created", worker_index, available),
    )
}

/// Renders one tile with the executing worker's renderer.
pub struct TileJob {
    renderers: TileRendererVec,
    frame: Arc<Frame>,
    tile_x: u32,
    tile_y: u32,
    abort_switch: AbortSwitch,
}

impl TileJob {
    pub fn new(
        renderers: TileRendererVec,
        frame: Arc<Frame>,
        tile_x: u32,
        tile_y: u32,
        abort_switch: AbortSwitch,
    ) -> Self {
        Self {
            renderers,
            frame,
            tile_x,
            tile_y,
            abort_switch,
        }
    }
}

impl Job for TileJob {
    fn execute(&mut self, worker_index: usize) -> Result<(), JobError> {
        let renderer = self
            .renderers
            .get(worker_index)
            .ok_or_else(|| missing_worker_state("tile renderer", worker_index, self.renderers.len()))?;

        renderer
            .lock()
            .render_tile(&self.frame, self.tile_x, self.tile_y, &self.abort_switch)
    }
}

/// Traces a batch of light paths with the executing worker's generator.
pub struct SampleGeneratorJob {
    generators: SampleGeneratorVec,
    frame: Arc<Frame>,
    sample_count: usize,
    abort_switch: AbortSwitch,
}

impl SampleGeneratorJob {
    pub fn new(
        generators: SampleGeneratorVec,
        frame: Arc<Frame>,
        sample_count: usize,
        abort_switch: AbortSwitch,
    ) -> Self {
        Self {
            generators,
            frame,
            sample_count,
            abort_switch,
        }
    }
}

impl Job for SampleGeneratorJob {
    fn execute(&mut self, worker_index: usize) -> Result<(), JobError> {
        let generator = self.generators.get(worker_index).ok_or_else(|| {
            missing_worker_state("sample generator", worker_index, self.generators.len())
        })?;

        generator
            .lock()
            .generate_samples(self.sample_count, &self.frame, &self.abort_switch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BlankTileRendererFactory, TileRendererFactory};
    use lumo_math::Vec4;

    struct CountingGenerator {
        calls: Arc<Mutex<Vec<usize>>>,
    }

    impl SampleGenerator for CountingGenerator {
        fn generate_samples(
            &mut self,
            count: usize,
            frame: &Frame,
            _abort_switch: &AbortSwitch,
        ) -> Result<(), JobError> {
            self.calls.lock().push(count);
            frame.accumulation().add_paths(count as u64);
            Ok(())
        }
    }

    fn blank_renderers(count: usize) -> TileRendererVec {
        (0..count)
            .map(|_| Mutex::new(BlankTileRendererFactory.create()))
            .collect()
    }

    #[test]
    fn test_tile_job_renders_its_tile() {
        let frame = Arc::new(Frame::new(8, 8, 4));
        frame.clear(Vec4::ONE);

        let mut job = TileJob::new(blank_renderers(2), Arc::clone(&frame), 1, 1, AbortSwitch::new());
        job.execute(1).unwrap();

        assert_eq!(frame.pixel(6, 6), Some(Vec4::new(0.0, 0.0, 0.0, 1.0)));
        assert_eq!(frame.pixel(1, 1), Some(Vec4::ONE));
    }

    #[test]
    fn test_unknown_worker_index_is_error() {
        let frame = Arc::new(Frame::new(8, 8, 4));
        let mut job = TileJob::new(blank_renderers(2), frame, 0, 0, AbortSwitch::new());

        let err = job.execute(5).unwrap_err();
        assert_eq!(
            err.to_string(),
            "no tile renderer for worker: worker 5 but only 2 were created"
        );
    }

    #[test]
    fn test_sample_job_uses_worker_generator() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let generators: SampleGeneratorVec = (0..3)
            .map(|_| {
                Mutex::new(Box::new(CountingGenerator {
                    calls: Arc::clone(&calls),
                }) as Box<dyn SampleGenerator>)
            })
            .collect();

        let frame = Arc::new(Frame::new(4, 4, 4));
        let mut job = SampleGeneratorJob::new(generators, Arc::clone(&frame), 64, AbortSwitch::new());
        job.execute(2).unwrap();
        job.execute(0).unwrap();

        assert_eq!(*calls.lock(), vec![64, 64]);
        assert_eq!(frame.accumulation().path_count(), 128);
    }
}
