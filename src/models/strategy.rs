// src/models/strategy.rs

//! Extraction strategies and their step sequences.

use std::fmt;
use std::iter::FusedIterator;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Upper bound on `repeat.times`.
pub const MAX_REPEAT_TIMES: usize = 10_000;

/// A named, ordered sequence of UI interactions meant to reveal
/// higher-resolution images on a listing page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Strategy {
    /// Unique identifier (e.g. "arrow-main")
    pub name: String,

    /// Steps executed in order
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Strategy {
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }

    /// Check that the steps are well formed.
    ///
    /// Every `repeat` must have a bounded count and at least one step that
    /// produces an action, so unrolling never spins without yielding.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::validation("strategy with empty name"));
        }
        if self.steps.is_empty() {
            return Err(AppError::validation(format!(
                "strategy '{}' has no steps",
                self.name
            )));
        }
        validate_steps(&self.name, &self.steps)
    }

    /// Expand the step tree into primitive actions.
    ///
    /// The iterator is lazy and single-use: nested `repeat` and `click_each`
    /// steps are unrolled only as the executor pulls them.
    pub fn steps(&self) -> StepIter<'_> {
        StepIter {
            stack: vec![Frame::Seq {
                steps: &self.steps,
                pos: 0,
            }],
        }
    }
}

/// One configured step of a strategy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Click the first element matching `selector`.
    Click { selector: String },

    /// Click the 1st, 2nd, ... element matching `selector`, up to `limit`.
    ClickEach {
        selector: String,
        #[serde(default = "default_each_limit")]
        limit: usize,
    },

    /// Suspend for a fixed duration.
    Wait { ms: u64 },

    /// Run the nested steps `times` times.
    Repeat { times: usize, steps: Vec<Step> },
}

fn default_each_limit() -> usize {
    40
}

fn validate_steps(name: &str, steps: &[Step]) -> Result<()> {
    for step in steps {
        if let Step::Repeat { times, steps } = step {
            if *times > MAX_REPEAT_TIMES {
                return Err(AppError::validation(format!(
                    "strategy '{name}': repeat times {times} exceeds {MAX_REPEAT_TIMES}"
                )));
            }
            if !steps.iter().any(Step::produces_actions) {
                return Err(AppError::validation(format!(
                    "strategy '{name}': repeat has no actions"
                )));
            }
            validate_steps(name, steps)?;
        }
    }
    Ok(())
}

impl Step {
    pub fn click(selector: impl Into<String>) -> Self {
        Self::Click {
            selector: selector.into(),
        }
    }

    pub fn click_each(selector: impl Into<String>, limit: usize) -> Self {
        Self::ClickEach {
            selector: selector.into(),
            limit,
        }
    }

    pub fn wait(ms: u64) -> Self {
        Self::Wait { ms }
    }

    pub fn repeat(times: usize, steps: Vec<Step>) -> Self {
        Self::Repeat { times, steps }
    }

    /// Whether expanding this step yields at least one action.
    pub fn produces_actions(&self) -> bool {
        match self {
            Step::Click { .. } | Step::Wait { .. } => true,
            Step::ClickEach { limit, .. } => *limit > 0,
            Step::Repeat { times, steps } => {
                *times > 0 && steps.iter().any(Step::produces_actions)
            }
        }
    }
}

/// A primitive page interaction produced by [`StepIter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action<'a> {
    /// Click the `index`-th element matching `selector`.
    Click { selector: &'a str, index: usize },
    /// Wait for the given number of milliseconds.
    Wait(u64),
}

impl fmt::Display for Action<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Click { selector, index: 0 } => write!(f, "click {selector}"),
            Action::Click { selector, index } => write!(f, "click {selector}[{index}]"),
            Action::Wait(ms) => write!(f, "wait {ms}ms"),
        }
    }
}

enum Frame<'a> {
    Seq { steps: &'a [Step], pos: usize },
    Each { selector: &'a str, next: usize, limit: usize },
    Repeat { steps: &'a [Step], remaining: usize },
}

enum Advance<'a> {
    Emit(Action<'a>),
    Push(Frame<'a>),
    Skip,
    Pop,
}

/// Lazy expansion of a strategy's steps.
pub struct StepIter<'a> {
    stack: Vec<Frame<'a>>,
}

impl<'a> Iterator for StepIter<'a> {
    type Item = Action<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let advance = match self.stack.last_mut()? {
                Frame::Seq { steps, pos } => {
                    let steps: &'a [Step] = *steps;
                    match steps.get(*pos) {
                        None => Advance::Pop,
                        Some(step) => {
                            *pos += 1;
                            match step {
                                Step::Click { selector } => Advance::Emit(Action::Click {
                                    selector,
                                    index: 0,
                                }),
                                Step::Wait { ms } => Advance::Emit(Action::Wait(*ms)),
                                Step::ClickEach { selector, limit } => Advance::Push(Frame::Each {
                                    selector,
                                    next: 0,
                                    limit: *limit,
                                }),
                                // Skipped outright so an empty body cannot spin
                                Step::Repeat { .. } if !step.produces_actions() => {
                                    Advance::Skip
                                }
                                Step::Repeat { times, steps } => Advance::Push(Frame::Repeat {
                                    steps,
                                    remaining: *times,
                                }),
                            }
                        }
                    }
                }
                Frame::Each {
                    selector,
                    next,
                    limit,
                } => {
                    if *next >= *limit {
                        Advance::Pop
                    } else {
                        let index = *next;
                        *next += 1;
                        Advance::Emit(Action::Click {
                            selector: *selector,
                            index,
                        })
                    }
                }
                Frame::Repeat { steps, remaining } => {
                    if *remaining == 0 {
                        Advance::Pop
                    } else {
                        *remaining -= 1;
                        Advance::Push(Frame::Seq {
                            steps: *steps,
                            pos: 0,
                        })
                    }
                }
            };

            match advance {
                Advance::Emit(action) => return Some(action),
                Advance::Push(frame) => self.stack.push(frame),
                Advance::Skip => {}
                Advance::Pop => {
                    self.stack.pop();
                }
            }
        }
    }
}

impl FusedIterator for StepIter<'_> {}
