use log::trace;

/// Receives highlight events from the cache. None of these can change cache state.
pub trait Visualize {
    fn hit(&mut self, _index: usize, _way: usize, _offset: usize) {}
    fn miss_victim(&mut self, _index: usize, _way: usize) {}
    fn miss_offset(&mut self, _index: usize, _way: usize, _offset: usize) {}
}

pub struct NoVisuals;

impl Visualize for NoVisuals {}

/// Emits every event at trace level.
pub struct LogVisuals;

impl Visualize for LogVisuals {
    fn hit(&mut self, index: usize, way: usize, offset: usize) {
        trace!("highlight set {index} way {way} offset {offset}");
    }

    fn miss_victim(&mut self, index: usize, way: usize) {
        trace!("flash set {index} way {way}");
    }

    fn miss_offset(&mut self, index: usize, way: usize, offset: usize) {
        trace!("flash set {index} way {way} offset {offset}");
    }
}
