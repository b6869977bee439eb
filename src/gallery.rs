use parking_lot::RwLock;

/// Append-only store of generated/uploaded images, addressed by URL
pub trait Gallery: Send + Sync {
    fn add_images(&self, urls: &[String]);

    fn list_all(&self) -> Vec<String>;

    fn index_of(&self, url: &str) -> Option<usize> {
        self.list_all().iter().position(|entry| entry == url)
    }

    fn get(&self, index: usize) -> Option<String> {
        self.list_all().get(index).cloned()
    }
}

/// In-process gallery. Adding a URL that is already present is a no-op.
#[derive(Debug, Default)]
pub struct MemoryGallery {
    urls: RwLock<Vec<String>>,
}

impl MemoryGallery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_images(urls: impl IntoIterator<Item = String>) -> Self {
        let gallery = Self::new();
        let urls: Vec<String> = urls.into_iter().collect();
        gallery.add_images(&urls);
        gallery
    }

    pub fn len(&self) -> usize {
        self.urls.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.read().is_empty()
    }
}

impl Gallery for MemoryGallery {
    fn add_images(&self, urls: &[String]) {
        let mut stored = self.urls.write();
        for url in urls {
            if !stored.contains(url) {
                stored.push(url.clone());
            }
        }
    }

    fn list_all(&self) -> Vec<String> {
        self.urls.read().clone()
    }

    fn index_of(&self, url: &str) -> Option<usize> {
        self.urls.read().iter().position(|entry| entry == url)
    }

    fn get(&self, index: usize) -> Option<String> {
        self.urls.read().get(index).cloned()
    }
}
