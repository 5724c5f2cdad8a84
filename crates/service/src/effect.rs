//! Single-shot asynchronous steps and their composition.
//!
//! An [`Effect`] is consumed by [`Effect::run`], so each one runs at most
//! once. Expected failures travel as `Err` in the returned [`Outcome`]; a
//! composed chain stops at the first `Err` without polling later steps.
//!
//! ```
//! use service::effect::{compose, from_fn, from_outcome, Effect};
//! use service::errors::RequestError;
//!
//! let double = from_fn(|x: u32| async move { Ok::<_, RequestError>(x * 2) });
//! let chain = compose(from_outcome(Ok(21)), double);
//! assert_eq!(tokio_test::block_on(chain.run(())), Ok(42));
//! ```

use std::future::Future;

use crate::errors::RequestError;

/// Two-variant result flowing through every pipeline stage.
pub type Outcome<T, E = RequestError> = Result<T, E>;

/// A deferred operation from `I` to an [`Outcome`].
pub trait Effect<I>: Send + Sized {
    type Output: Send;

    fn run(self, input: I) -> impl Future<Output = Outcome<Self::Output>> + Send;
}

/// Runs `first`, then feeds its value to `next`.
#[derive(Debug)]
pub struct Compose<A, B> {
    first: A,
    next: B,
}

impl<A, B> Compose<A, B> {
    /// Append another step to the chain.
    pub fn then<C>(self, next: C) -> Compose<Self, C> {
        compose(self, next)
    }
}

pub fn compose<A, B>(first: A, next: B) -> Compose<A, B> {
    Compose { first, next }
}

impl<I, A, B> Effect<I> for Compose<A, B>
where
    I: Send,
    A: Effect<I>,
    B: Effect<A::Output>,
{
    type Output = B::Output;

    fn run(self, input: I) -> impl Future<Output = Outcome<B::Output>> + Send {
        async move {
            let value = self.first.run(input).await?;
            self.next.run(value).await
        }
    }
}

/// An already computed outcome; ignores its input.
#[derive(Debug)]
pub struct FromOutcome<T>(Outcome<T>);

pub fn from_outcome<T>(outcome: Outcome<T>) -> FromOutcome<T> {
    FromOutcome(outcome)
}

impl<I, T> Effect<I> for FromOutcome<T>
where
    T: Send,
{
    type Output = T;

    fn run(self, _input: I) -> impl Future<Output = Outcome<T>> + Send {
        std::future::ready(self.0)
    }
}

/// An async closure used as an effect.
pub struct FromFn<F>(F);

impl<F> std::fmt::Debug for FromFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("FromFn").field(&"<function>").finish()
    }
}

pub fn from_fn<F>(f: F) -> FromFn<F> {
    FromFn(f)
}

impl<I, F, Fut, T> Effect<I> for FromFn<F>
where
    F: FnOnce(I) -> Fut + Send,
    Fut: Future<Output = Outcome<T>> + Send,
    T: Send,
{
    type Output = T;

    fn run(self, input: I) -> impl Future<Output = Outcome<T>> + Send {
        (self.0)(input)
    }
}

/// Runs the inner effect on the first half of a pair and hands the second
/// half through untouched.
#[derive(Debug)]
pub struct Carry<E>(E);

pub fn carry<E>(effect: E) -> Carry<E> {
    Carry(effect)
}

impl<I, X, E> Effect<(I, X)> for Carry<E>
where
    I: Send,
    X: Send,
    E: Effect<I>,
{
    type Output = (E::Output, X);

    fn run(self, (input, carried): (I, X)) -> impl Future<Output = Outcome<(E::Output, X)>> + Send {
        async move {
            let value = self.0.run(input).await?;
            Ok((value, carried))
        }
    }
}
