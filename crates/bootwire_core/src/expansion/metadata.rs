//! Metadata reader seam.

use crate::error::BootResult;
use crate::model::class::{ClassMetadata, ClassRef};
use log::trace;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Supplies declarative metadata for a class.
pub trait MetadataReader: Send + Sync {
    fn read(&self, class: &ClassRef) -> BootResult<Arc<ClassMetadata>>;

    /// Drops transient per-run state.
    fn clear_cache(&self) {}
}

/// Reads metadata from the class model and memoizes it by class name.
#[derive(Default)]
pub struct CachingMetadataReader {
    cache: Mutex<BTreeMap<String, Arc<ClassMetadata>>>,
}

impl CachingMetadataReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cached_len(&self) -> usize {
        self.cache.lock().len()
    }
}

impl MetadataReader for CachingMetadataReader {
    fn read(&self, class: &ClassRef) -> BootResult<Arc<ClassMetadata>> {
        let mut cache = self.cache.lock();
        let metadata = cache
            .entry(class.user_class_name().to_string())
            .or_insert_with(|| Arc::new(class.metadata().clone()));
        Ok(Arc::clone(metadata))
    }

    fn clear_cache(&self) {
        let mut cache = self.cache.lock();
        trace!(
            "event=metadata_cache_cleared module=expand status=ok entries={}",
            cache.len()
        );
        cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::{CachingMetadataReader, MetadataReader};
    use crate::model::class::ComponentClass;
    use std::sync::Arc;

    #[test]
    fn caches_until_cleared() {
        let reader = CachingMetadataReader::new();
        let class = ComponentClass::builder("app.Config").configuration().build();
        let first = reader.read(&class).expect("read metadata");
        let second = reader.read(&class).expect("read metadata again");
        assert!(Arc::ptr_eq(&first, &second));
        assert!(first.configuration);
        assert_eq!(reader.cached_len(), 1);

        reader.clear_cache();
        assert_eq!(reader.cached_len(), 0);
    }
}
