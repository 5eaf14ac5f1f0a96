//! Memoized shared load
//!
//! The first caller of [`SharedLoad::get_or_load`] runs the loader. Callers
//! arriving while it runs wait on the same outcome instead of starting their
//! own. Successes are cached for good; failures are handed to every waiter and
//! then forgotten, so the next call retries.

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use tokio::sync::watch;

type Outcome<T, E> = Option<Result<T, E>>;

enum State<T, E> {
    Idle,
    Loading(watch::Receiver<Outcome<T, E>>),
    Ready(T),
}

enum Role<T, E> {
    Lead(watch::Sender<Outcome<T, E>>),
    Wait(watch::Receiver<Outcome<T, E>>),
}

/// A value loaded at most once at a time and cached on success
pub struct SharedLoad<T, E> {
    state: Mutex<State<T, E>>,
}

impl<T: Clone, E: Clone> SharedLoad<T, E> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::Idle),
        }
    }

    /// Already loaded with `value`
    pub fn ready(value: T) -> Self {
        Self {
            state: Mutex::new(State::Ready(value)),
        }
    }

    /// Cached value, without waiting on a pending load
    pub fn peek(&self) -> Option<T> {
        match &*self.lock() {
            State::Ready(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// True while a loader is running
    pub fn is_loading(&self) -> bool {
        matches!(&*self.lock(), State::Loading(_))
    }

    /// Return the cached value, join a pending load, or start one
    pub async fn get_or_load<F, Fut>(&self, load: F) -> Result<T, E>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        loop {
            let role = {
                let mut state = self.lock();
                match &*state {
                    State::Ready(value) => return Ok(value.clone()),
                    State::Loading(rx) => Role::Wait(rx.clone()),
                    State::Idle => {
                        let (tx, rx) = watch::channel(None);
                        *state = State::Loading(rx);
                        Role::Lead(tx)
                    }
                }
            };

            match role {
                Role::Wait(mut rx) => {
                    let outcome = match rx.wait_for(Option::is_some).await {
                        Ok(outcome) => (*outcome).clone(),
                        // Leader dropped before finishing; state is Idle again
                        Err(_) => None,
                    };
                    if let Some(result) = outcome {
                        return result;
                    }
                }
                Role::Lead(tx) => {
                    let mut guard = ResetOnDrop {
                        state: &self.state,
                        armed: true,
                    };
                    let result = load().await;

                    *self.lock() = match &result {
                        Ok(value) => State::Ready(value.clone()),
                        Err(_) => State::Idle,
                    };
                    guard.armed = false;

                    // No receivers left is fine
                    let _ = tx.send(Some(result.clone()));
                    return result;
                }
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State<T, E>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clone, E: Clone> Default for SharedLoad<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Puts the state back to idle if the leading future is dropped mid-load
struct ResetOnDrop<'a, T, E> {
    state: &'a Mutex<State<T, E>>,
    armed: bool,
}

impl<T, E> Drop for ResetOnDrop<'_, T, E> {
    fn drop(&mut self) {
        if self.armed {
            *self.state.lock().unwrap_or_else(PoisonError::into_inner) = State::Idle;
        }
    }
}
