//! Deskflow handlers -- email, desktop automation, shell, placeholders.
//!
//! Each handler implements [`deskflow_kernel::ActionHandler`] for one catalog
//! action.  [`register_all`] wires the full production set into a
//! [`RegistryBuilder`] from an [`AdaptersConfig`].

pub mod desktop;
pub mod email;
pub mod error;
pub mod mime;
pub mod placeholders;
pub mod shell;

use std::sync::Arc;

use serde::Deserialize;

use deskflow_kernel::{ActionName, RegistryBuilder};

pub use desktop::{
    AppLauncher, DesktopConfig, InputDriver, MouseButton, MouseClicker, MouseMover, TextTyper,
    XdotoolDriver,
};
pub use email::{EmailConfig, EmailSummarizer};
pub use error::{AdapterError, Result};
pub use placeholders::Placeholder;
pub use shell::{CommandExecutor, ShellConfig};

/// Handler configuration: the `[email]`, `[desktop]` and `[shell]` sections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AdaptersConfig {
    pub email: EmailConfig,
    pub desktop: DesktopConfig,
    pub shell: ShellConfig,
}

/// Register the production handler for every catalog action, using the
/// `xdotool` input driver named in the desktop config.
pub fn register_all(builder: RegistryBuilder, config: &AdaptersConfig) -> RegistryBuilder {
    let driver: Arc<dyn InputDriver> =
        Arc::new(XdotoolDriver::new(config.desktop.driver_program.clone()));
    register_with_driver(builder, config, driver)
}

/// Like [`register_all`] with a caller-supplied input driver.
pub fn register_with_driver(
    builder: RegistryBuilder,
    config: &AdaptersConfig,
    driver: Arc<dyn InputDriver>,
) -> RegistryBuilder {
    builder
        .register(
            ActionName::SummarizeEmails,
            EmailSummarizer::new(config.email.clone()),
        )
        .register(ActionName::FetchCrmInteractions, Placeholder::crm())
        .register(ActionName::FetchCalendarEvents, Placeholder::calendar())
        .register(ActionName::OpenApp, AppLauncher::new(&config.desktop))
        .register(
            ActionName::TypeText,
            TextTyper::new(Arc::clone(&driver), &config.desktop),
        )
        .register(
            ActionName::MoveMouse,
            MouseMover::new(Arc::clone(&driver), &config.desktop),
        )
        .register(ActionName::ClickMouse, MouseClicker::new(driver))
        .register(
            ActionName::ExecuteTerminatorCommand,
            CommandExecutor::new(config.shell.clone()),
        )
}
