use async_trait::async_trait;

/// A long running task owned by the [`Service`](crate::Service).
#[async_trait]
pub trait SupervisorActor {
    /// The error type for the actor.
    type Error: std::fmt::Debug;

    /// Runs the actor until it finishes or is cancelled.
    async fn start(mut self) -> Result<(), Self::Error>;
}
