//! The embedding host: template rendering, action dispatch and user
//! notifications.
//!
//! A view never performs side effects outside its own state. It hands
//! view models to [`Host::render`], actions to [`Host::dispatch`] and
//! failures to [`Host::notify`].

use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{ReportError, Result};
use crate::models::ActionDescriptor;
use crate::render::Template;

/// Services a report view needs from its host.
pub trait Host: core::fmt::Debug + Send + Sync {
    /// Renders `template` into markup.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Render`] if the template cannot be
    /// rendered.
    fn render(&self, template: &Template) -> Result<String>;

    /// Runs an action (download, window, client view). Fire-and-forget.
    fn dispatch(&self, action: ActionDescriptor);

    /// Shows a failure to the user.
    fn notify(&self, error: &ReportError);
}

impl<H: Host + ?Sized> Host for &H {
    #[inline]
    fn render(&self, template: &Template) -> Result<String> {
        (**self).render(template)
    }

    #[inline]
    fn dispatch(&self, action: ActionDescriptor) {
        (**self).dispatch(action);
    }

    #[inline]
    fn notify(&self, error: &ReportError) {
        (**self).notify(error);
    }
}

impl<H: Host + ?Sized> Host for Arc<H> {
    #[inline]
    fn render(&self, template: &Template) -> Result<String> {
        (**self).render(template)
    }

    #[inline]
    fn dispatch(&self, action: ActionDescriptor) {
        (**self).dispatch(action);
    }

    #[inline]
    fn notify(&self, error: &ReportError) {
        (**self).notify(error);
    }
}

/// Everything a [`RecordingHost`] has seen.
#[derive(Debug, Default)]
struct Recorded {
    /// Names of rendered templates, in order.
    renders: Vec<&'static str>,
    /// Dispatched actions, in order.
    actions: Vec<ActionDescriptor>,
    /// Messages of notified errors, in order.
    notifications: Vec<String>,
}

/// In-memory host that renders `name` followed by the JSON context and
/// records actions and notifications.
///
/// # Example
///
/// ```rust
/// use dynamic_reports::host::{Host, RecordingHost};
/// use dynamic_reports::models::ActionDescriptor;
///
/// let host = RecordingHost::new();
/// host.dispatch(ActionDescriptor::form("account.move", 1));
/// assert_eq!(host.actions().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct RecordingHost {
    /// Recorded calls.
    inner: Mutex<Recorded>,
}

impl RecordingHost {
    /// Creates a host with nothing recorded.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of rendered templates, in order.
    #[inline]
    #[must_use]
    pub fn renders(&self) -> Vec<&'static str> {
        self.with_recorded(|recorded| recorded.renders.clone())
    }

    /// Dispatched actions, in order.
    #[inline]
    #[must_use]
    pub fn actions(&self) -> Vec<ActionDescriptor> {
        self.with_recorded(|recorded| recorded.actions.clone())
    }

    /// Messages of notified errors, in order.
    #[inline]
    #[must_use]
    pub fn notifications(&self) -> Vec<String> {
        self.with_recorded(|recorded| recorded.notifications.clone())
    }

    /// Applies `f` to the recorded calls, recovering from poisoning.
    fn with_recorded<R>(&self, f: impl FnOnce(&mut Recorded) -> R) -> R {
        let mut recorded = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut recorded)
    }
}

impl Host for RecordingHost {
    #[inline]
    fn render(&self, template: &Template) -> Result<String> {
        let context = template.context()?;
        let name = template.name();
        self.with_recorded(|recorded| recorded.renders.push(name));
        Ok(format!("{name} {context}"))
    }

    #[inline]
    fn dispatch(&self, action: ActionDescriptor) {
        self.with_recorded(|recorded| recorded.actions.push(action));
    }

    #[inline]
    fn notify(&self, error: &ReportError) {
        let message = error.to_string();
        self.with_recorded(|recorded| recorded.notifications.push(message));
    }
}
