//! Channel builder settings exposed to proxy construction

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::proxy::DispatchTarget;
use crate::types::{BridgeError, Result};
use super::behaviors::Behaviors;

/// Channel factory collaborator
pub trait ChannelFactory: Send + Sync {
    /// Endpoint address the factory connects to
    fn address(&self) -> &str;

    /// Open a channel; the returned target receives dispatched calls
    fn create_channel(&self) -> Result<Arc<dyn DispatchTarget>>;
}

/// Builds the channel factory on first use
pub trait ChannelFactoryBuilder: Send + Sync {
    fn build(&self, behaviors: &Behaviors) -> Result<Arc<dyn ChannelFactory>>;
}

/// Read accessor over channel-factory and behavior state
pub trait ProvideChannelBuilderSettings: Send + Sync {
    /// Factory for configuration; fails once the factory is frozen
    fn channel_factory_read_write(&self) -> Result<Arc<dyn ChannelFactory>>;

    /// Factory for use; freezes it on first call
    fn channel_factory_read_only(&self) -> Result<Arc<dyn ChannelFactory>>;

    /// Endpoint behaviors, read-only
    fn behaviors(&self) -> &Behaviors;

    /// The service channel, opened once and reused
    fn service_channel(&self) -> Result<Arc<dyn DispatchTarget>>;
}

#[derive(Default)]
struct FactoryState {
    factory: Option<Arc<dyn ChannelFactory>>,
    frozen: bool,
    channel: Option<Arc<dyn DispatchTarget>>,
}

/// Default settings holder
///
/// Behaviors are fixed at construction; mutation belongs to the channel
/// configuration code that builds this value.
pub struct ChannelBuilderSettings {
    builder: Arc<dyn ChannelFactoryBuilder>,
    behaviors: Behaviors,
    state: Mutex<FactoryState>,
}

impl ChannelBuilderSettings {
    pub fn new(builder: Arc<dyn ChannelFactoryBuilder>, behaviors: Behaviors) -> Self {
        Self {
            builder,
            behaviors,
            state: Mutex::new(FactoryState::default()),
        }
    }

    /// Whether read-only access has frozen the factory
    pub fn is_frozen(&self) -> bool {
        self.state.lock().frozen
    }

    fn factory(&self, state: &mut FactoryState) -> Result<Arc<dyn ChannelFactory>> {
        if let Some(factory) = &state.factory {
            return Ok(factory.clone());
        }
        let factory = self.builder.build(&self.behaviors)?;
        debug!(address = factory.address(), "channel factory built");
        state.factory = Some(factory.clone());
        Ok(factory)
    }

    fn frozen_factory(&self, state: &mut FactoryState) -> Result<Arc<dyn ChannelFactory>> {
        let factory = self.factory(state)?;
        if !state.frozen {
            for behavior in self.behaviors.iter() {
                behavior.validate(factory.address())?;
            }
            state.frozen = true;
            debug!(address = factory.address(), behaviors = self.behaviors.len(), "channel factory frozen");
        }
        Ok(factory)
    }
}

impl ProvideChannelBuilderSettings for ChannelBuilderSettings {
    fn channel_factory_read_write(&self) -> Result<Arc<dyn ChannelFactory>> {
        let mut state = self.state.lock();
        if state.frozen {
            return Err(BridgeError::ChannelFactoryFrozen);
        }
        self.factory(&mut state)
    }

    fn channel_factory_read_only(&self) -> Result<Arc<dyn ChannelFactory>> {
        let mut state = self.state.lock();
        self.frozen_factory(&mut state)
    }

    fn behaviors(&self) -> &Behaviors {
        &self.behaviors
    }

    fn service_channel(&self) -> Result<Arc<dyn DispatchTarget>> {
        let mut state = self.state.lock();
        if let Some(channel) = &state.channel {
            return Ok(channel.clone());
        }
        let factory = self.frozen_factory(&mut state)?;
        let channel = factory.create_channel()?;
        info!(address = factory.address(), "service channel opened");
        state.channel = Some(channel.clone());
        Ok(channel)
    }
}
