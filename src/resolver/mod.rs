//! Per-platform resolver implementations and the registry that dispatches to
//! them.

pub mod bilibili;
pub mod douyin;
pub mod kuaishou;
pub mod tencent;
pub mod vimeo;
pub mod xigua;
pub mod youtube;

pub use bilibili::BilibiliResolver;
pub use douyin::DouyinResolver;
pub use kuaishou::KuaishouResolver;
pub use tencent::TencentResolver;
pub use vimeo::VimeoResolver;
pub use xigua::XiguaResolver;
pub use youtube::YoutubeResolver;

use std::sync::Arc;

use tracing::debug;

use crate::classify::Platform;
use crate::PlatformResolver;

/// Holds one resolver per platform. Adding support for a new platform means
/// implementing [`PlatformResolver`] and registering it here.
pub struct ResolverRegistry {
    resolvers: Vec<Arc<dyn PlatformResolver>>,
}

impl Default for ResolverRegistry {
    fn default() -> Self {
        Self::with_default_resolvers()
    }
}

impl ResolverRegistry {
    pub fn empty() -> Self {
        Self {
            resolvers: Vec::new(),
        }
    }

    /// The single construction site for the built-in resolver set.
    pub fn with_default_resolvers() -> Self {
        let resolvers: Vec<Arc<dyn PlatformResolver>> = vec![
            Arc::new(BilibiliResolver::new()),
            Arc::new(DouyinResolver::new()),
            Arc::new(TencentResolver::new()),
            Arc::new(XiguaResolver::new()),
            Arc::new(KuaishouResolver::new()),
            Arc::new(YoutubeResolver::new()),
            Arc::new(VimeoResolver::new()),
        ];
        debug!(count = resolvers.len(), "Resolver registry initialized");
        Self { resolvers }
    }

    /// Registers a resolver, replacing any existing one for the same
    /// platform.
    pub fn register(&mut self, resolver: Arc<dyn PlatformResolver>) {
        let platform = resolver.platform();
        debug!(platform = %platform, "Registering resolver");
        match self.resolvers.iter_mut().find(|r| r.platform() == platform) {
            Some(slot) => *slot = resolver,
            None => self.resolvers.push(resolver),
        }
    }

    pub fn for_platform(&self, platform: Platform) -> Option<Arc<dyn PlatformResolver>> {
        self.resolvers
            .iter()
            .find(|r| r.platform() == platform)
            .cloned()
    }

    /// First resolver whose `can_handle` accepts the URL, in registration
    /// order.
    pub fn for_url(&self, url: &str) -> Option<Arc<dyn PlatformResolver>> {
        self.resolvers.iter().find(|r| r.can_handle(url)).cloned()
    }

    pub fn platforms(&self) -> Vec<Platform> {
        self.resolvers.iter().map(|r| r.platform()).collect()
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}
