use core::pin::Pin;
use core::task::{Context, Poll};
use futures::{Future, ready};
use pin_project_lite::pin_project;
use tokio::sync::oneshot;

/// Sending half of a set-once result slot.
///
/// Only the first call to [`CompletionTx::complete`] has an effect.
#[derive(Debug)]
pub struct CompletionTx<T> {
    tx: Option<oneshot::Sender<T>>,
}

impl<T> CompletionTx<T> {
    /// Completes the slot with `value`.
    ///
    /// Returns `true` when `value` reached the receiver, `false` if the slot was
    /// already completed or the receiver is gone.
    pub fn complete(&mut self, value: T) -> bool {
        match self.tx.take() {
            Some(tx) => tx.send(value).is_ok(),
            None => false,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.tx.is_none()
    }

    /// Returns `true` when nobody is waiting for the value anymore.
    pub fn is_cancelled(&self) -> bool {
        self.tx.as_ref().is_some_and(|tx| tx.is_closed())
    }
}

pin_project! {
    /// Receiving half of a set-once result slot.
    ///
    /// Resolves to `None` if the [`CompletionTx`] was dropped without completing.
    #[must_use = "futures do nothing unless polled"]
    #[derive(Debug)]
    pub struct CompletionRx<T> {
        #[pin]
        rx: oneshot::Receiver<T>,
    }
}

impl<T> Future for CompletionRx<T> {
    type Output = Option<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let result = ready!(this.rx.poll(cx));

        Poll::Ready(result.ok())
    }
}

/// Creates a new pair of [`CompletionTx`] and [`CompletionRx`].
pub fn create_completion<T>() -> (CompletionTx<T>, CompletionRx<T>) {
    let (tx, rx) = oneshot::channel();
    (CompletionTx { tx: Some(tx) }, CompletionRx { rx })
}
