use anyhow::Result;
use ossmount_domain::{CredentialStore, MountRegistry, MountScriptSynthesizer, SupervisorConfigManager};

use crate::config::{Config, EnvSnapshot, GlobalOptions, Layout};
use crate::effects::{self, Effects, SharedEffects};
use crate::CommandGroup;

#[derive(Clone, Copy, Debug)]
pub struct CommandInfo {
    pub group: CommandGroup,
    pub name: &'static str,
}

impl CommandInfo {
    #[must_use]
    pub const fn new(group: CommandGroup, name: &'static str) -> Self {
        Self { group, name }
    }
}

pub struct CommandContext<'a> {
    pub global: &'a GlobalOptions,
    config: Config,
    effects: SharedEffects,
}

impl<'a> CommandContext<'a> {
    /// Creates a new command context with the provided global options.
    ///
    /// # Errors
    /// Returns an error if the configuration cannot be prepared.
    pub fn new(global: &'a GlobalOptions, effects: SharedEffects) -> Result<Self> {
        Self::with_snapshot(global, &EnvSnapshot::capture(), effects)
    }

    pub(crate) fn with_snapshot(
        global: &'a GlobalOptions,
        env: &EnvSnapshot,
        effects: SharedEffects,
    ) -> Result<Self> {
        let config = Config::from_snapshot(env, global)?;
        Ok(Self {
            global,
            config,
            effects,
        })
    }

    pub fn effects(&self) -> &dyn Effects {
        self.effects.as_ref()
    }

    pub fn packages(&self) -> &dyn effects::PackageManager {
        self.effects.packages()
    }

    pub fn downloader(&self) -> &dyn effects::Downloader {
        self.effects.downloader()
    }

    pub fn supervisor(&self) -> &dyn effects::SupervisorControl {
        self.effects.supervisor()
    }

    pub fn tools(&self) -> &dyn effects::ToolLocator {
        self.effects.tools()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn layout(&self) -> &Layout {
        self.config.layout()
    }

    pub fn credential_store(&self) -> CredentialStore {
        CredentialStore::new(self.layout().passwd_file())
    }

    /// Loads the mount manifest.
    ///
    /// # Errors
    /// Returns an error if the manifest exists but cannot be read or parsed.
    pub fn mount_registry(&self) -> Result<MountRegistry> {
        MountRegistry::load(self.layout().manifest())
    }

    pub fn script_synthesizer(&self) -> MountScriptSynthesizer {
        MountScriptSynthesizer::new(self.layout().scripts_dir())
    }

    pub fn supervisor_configs(&self) -> SupervisorConfigManager {
        SupervisorConfigManager::new(
            self.layout().primary_config(),
            self.layout().fragments_dir(),
            self.config.supervisor().link.clone(),
        )
    }
}
