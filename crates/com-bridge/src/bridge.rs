//! Bridge runtime
//!
//! Owns the process-wide pieces of the bridge:
//! - Type cache
//! - Native handle table
//! - Security perimeter registry
//! - Proxy creator and class factory
//! - Server lock count

use std::sync::Arc;

use tracing::info;

use crate::activation::{ClassFactory, ComInstance, ProxyClassFactory, ServerLock, ServiceMoniker};
use crate::channel::ProvideChannelBuilderSettings;
use crate::config::BridgeConfig;
use crate::proxy::{HandleProxyProvider, HandleTable, ProxyCreator, ServiceProxyCreator};
use crate::security::{ContextId, PerimeterRegistry, SecurityPerimeter};
use crate::typecache::{StaticTypeTable, SyntheticTypeGenerator, TypeCacheManager};
use crate::types::{iid, BridgeError, Result};

/// COM bridge runtime
pub struct ComBridge {
    config: BridgeConfig,
    cache: Arc<TypeCacheManager>,
    handles: Arc<HandleTable>,
    perimeters: Arc<PerimeterRegistry>,
    server_lock: Arc<ServerLock>,
    settings: Arc<dyn ProvideChannelBuilderSettings>,
    creator: Arc<ServiceProxyCreator>,
    factory: ProxyClassFactory,
    context: ContextId,
}

impl ComBridge {
    /// Create a bridge with a type cache built from `config`
    pub fn new(config: BridgeConfig, settings: Arc<dyn ProvideChannelBuilderSettings>) -> Self {
        let mut cache = TypeCacheManager::new(StaticTypeTable::with_well_known());
        if config.synthesize_types {
            cache = cache.with_generator(Arc::new(SyntheticTypeGenerator));
        }
        Self::with_type_cache(config, Arc::new(cache), settings)
    }

    /// Create a bridge sharing an existing type cache
    pub fn with_type_cache(
        config: BridgeConfig,
        cache: Arc<TypeCacheManager>,
        settings: Arc<dyn ProvideChannelBuilderSettings>,
    ) -> Self {
        let handles = Arc::new(HandleTable::new());
        let perimeters = Arc::new(PerimeterRegistry::new());
        let server_lock = Arc::new(ServerLock::new());
        let context = ContextId::generate();

        // The home context is inside its own perimeter
        perimeters.perimeter(context).set_perimeter_flag(true);

        let creator = Arc::new(
            ServiceProxyCreator::new(
                cache.clone(),
                handles.clone(),
                Arc::new(HandleProxyProvider::new(handles.clone())),
                settings.clone(),
                perimeters.clone(),
            )
            .with_capabilities(config.capabilities)
            .with_no_assembly_generation(config.no_assembly_generation),
        );
        let factory = ProxyClassFactory::new(creator.clone(), handles.clone(), server_lock.clone(), context)
            .with_aggregation(config.allow_aggregation);

        info!(%context, ?config, "bridge created");
        Self {
            config,
            cache,
            handles,
            perimeters,
            server_lock,
            settings,
            creator,
            factory,
            context,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn type_cache(&self) -> &Arc<TypeCacheManager> {
        &self.cache
    }

    pub fn handles(&self) -> &Arc<HandleTable> {
        &self.handles
    }

    pub fn perimeters(&self) -> &Arc<PerimeterRegistry> {
        &self.perimeters
    }

    pub fn server_lock(&self) -> &Arc<ServerLock> {
        &self.server_lock
    }

    pub fn settings(&self) -> &Arc<dyn ProvideChannelBuilderSettings> {
        &self.settings
    }

    pub fn proxy_creator(&self) -> Arc<dyn ProxyCreator> {
        self.creator.clone()
    }

    pub fn class_factory(&self) -> &dyn ClassFactory {
        &self.factory
    }

    /// Home context of the bridge
    pub fn context(&self) -> ContextId {
        self.context
    }

    /// Activate an instance from a service moniker display name
    ///
    /// The `address` must name the endpoint of the configured channel
    /// factory, which freezes it. The `contract` keyword selects the
    /// interface when it is an IID; otherwise the instance is late-bound
    /// through IDispatch.
    pub fn activate(&self, display_name: &str) -> Result<ComInstance> {
        let moniker = ServiceMoniker::parse(display_name)?;
        let address = moniker
            .address()
            .ok_or_else(|| BridgeError::InvalidArgument("moniker has no address".to_string()))?;

        let factory = self.settings.channel_factory_read_only()?;
        if factory.address() != address {
            return Err(BridgeError::InvalidArgument(format!(
                "moniker address {address} does not match channel endpoint {}",
                factory.address()
            )));
        }
        let iid = moniker.contract_id().unwrap_or(iid::IDISPATCH);

        info!(address, %iid, "activating service moniker");
        self.factory.create_instance(None, &iid)
    }
}
