//! The wrap point: one unit of work in, one result out.

use std::sync::Arc;

/// Handles one unit of work for the host.
///
/// Monitors implement this trait themselves and wrap an inner handler, so
/// any number of them can be stacked at worker startup.
pub trait WorkHandler<W>: Send + Sync {
    type Output;

    fn handle(&self, work: W) -> Self::Output;
}

/// Adapts a closure into a [`WorkHandler`].
#[derive(Clone)]
pub struct FnHandler<F>(F);

pub fn handler_fn<F>(f: F) -> FnHandler<F> {
    FnHandler(f)
}

impl<W, O, F> WorkHandler<W> for FnHandler<F>
where
    F: Fn(W) -> O + Send + Sync,
{
    type Output = O;

    fn handle(&self, work: W) -> O {
        (self.0)(work)
    }
}

impl<W, H> WorkHandler<W> for Box<H>
where
    H: WorkHandler<W> + ?Sized,
{
    type Output = H::Output;

    fn handle(&self, work: W) -> Self::Output {
        (**self).handle(work)
    }
}

impl<W, H> WorkHandler<W> for Arc<H>
where
    H: WorkHandler<W> + ?Sized,
{
    type Output = H::Output;

    fn handle(&self, work: W) -> Self::Output {
        (**self).handle(work)
    }
}
