//! Callbacks run around the main loop.

use std::fmt;

use weft_core::{ModelError, World};

use crate::Error;

/// A callback that may inspect or modify the world at a given time.
pub type Hook = Box<dyn Fn(&mut World, f64) -> Result<(), ModelError>>;

/// When a hook runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookStage {
    /// Once, after initial Explicit values are computed and before any
    /// discontinuity is scheduled.
    Pre,

    /// After every discontinuity cycle.
    Mid,

    /// Once, after the main loop ends.
    Post,
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pre => "pre",
            Self::Mid => "mid",
            Self::Post => "post",
        })
    }
}

/// Hooks grouped by stage, each group run in registration order.
#[derive(Default)]
pub struct Hooks {
    pre: Vec<Hook>,
    mid: Vec<Hook>,
    post: Vec<Hook>,
}

impl Hooks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<F>(&mut self, stage: HookStage, hook: F)
    where
        F: Fn(&mut World, f64) -> Result<(), ModelError> + 'static,
    {
        self.stage_mut(stage).push(Box::new(hook));
    }

    /// Builder form of [`Hooks::add`].
    #[must_use]
    pub fn with<F>(mut self, stage: HookStage, hook: F) -> Self
    where
        F: Fn(&mut World, f64) -> Result<(), ModelError> + 'static,
    {
        self.add(stage, hook);
        self
    }

    pub(crate) fn run(&self, stage: HookStage, world: &mut World, time: f64) -> Result<(), Error> {
        for hook in self.stage(stage) {
            hook(world, time).map_err(|source| Error::Hook {
                stage,
                time,
                source,
            })?;
        }
        Ok(())
    }

    fn stage(&self, stage: HookStage) -> &[Hook] {
        match stage {
            HookStage::Pre => &self.pre,
            HookStage::Mid => &self.mid,
            HookStage::Post => &self.post,
        }
    }

    fn stage_mut(&mut self, stage: HookStage) -> &mut Vec<Hook> {
        match stage {
            HookStage::Pre => &mut self.pre,
            HookStage::Mid => &mut self.mid,
            HookStage::Post => &mut self.post,
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("pre", &self.pre.len())
            .field("mid", &self.mid.len())
            .field("post", &self.post.len())
            .finish()
    }
}
