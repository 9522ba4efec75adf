//! Quiz engine
//!
//! Stateless question generation over a dataset snapshot. All randomness
//! comes from the caller's cryptographically secure generator.

use crate::dataset::{Dataset, Record, RecordId, StatVector};
use pokequiz_common::{Error, Result};
use rand::seq::SliceRandom;
use rand::{CryptoRng, Rng};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

/// Option set size, target included
pub const OPTION_COUNT: usize = 4;

/// Where the target is drawn from
#[derive(Debug, Clone, Copy)]
pub enum QuizMode<'a> {
    /// Uniformly from one category pool (`"all"` included)
    Category(&'a str),
    /// Uniformly from the user's missed ids
    Review(&'a [RecordId]),
}

/// Question payload; the target's name is deliberately absent
#[derive(Debug, Clone, Serialize)]
pub struct QuizQuestion {
    pub id: RecordId,
    pub stats: StatVector,
    pub options: Vec<String>,
    pub height: f32,
    pub weight: f32,
    pub types: Vec<String>,
}

pub fn next_question<R>(dataset: &Dataset, mode: QuizMode<'_>, rng: &mut R) -> Result<QuizQuestion>
where
    R: Rng + CryptoRng + ?Sized,
{
    let (target, pool) = match mode {
        QuizMode::Category(category) => {
            let pool = dataset
                .pool(category)
                .filter(|pool| !pool.is_empty())
                .ok_or_else(|| Error::NotFound(format!("category '{}'", category)))?;
            let target = pool
                .choose(rng)
                .ok_or_else(|| Error::NotFound(format!("category '{}'", category)))?;
            (target, pool)
        }
        QuizMode::Review(missed) => {
            let candidates: Vec<&Arc<Record>> =
                missed.iter().filter_map(|id| dataset.get(*id)).collect();
            let target = *candidates
                .choose(rng)
                .ok_or_else(|| Error::NotFound("nothing to review".to_string()))?;
            (target, review_pool(dataset, target))
        }
    };

    Ok(QuizQuestion {
        id: target.id,
        stats: target.stats,
        options: build_options(target, pool, rng),
        height: target.height,
        weight: target.weight,
        types: target.types.clone(),
    })
}

/// Option pool for a review target: its own category, else every record
fn review_pool<'a>(dataset: &'a Dataset, target: &Record) -> &'a [Arc<Record>] {
    match target.category().and_then(|category| dataset.pool(category)) {
        Some(pool) if !pool.is_empty() => pool,
        _ => {
            warn!(
                record_id = target.id,
                category = %target.category,
                "Category pool unusable for review target, using all records"
            );
            dataset.all()
        }
    }
}

/// Target name plus up to three distinct distractor names, shuffled
fn build_options<R>(target: &Record, pool: &[Arc<Record>], rng: &mut R) -> Vec<String>
where
    R: Rng + ?Sized,
{
    let mut others: Vec<&Arc<Record>> = pool.iter().filter(|r| r.id != target.id).collect();
    others.shuffle(rng);

    let mut options: Vec<String> = Vec::with_capacity(OPTION_COUNT);
    for record in others {
        if options.len() == OPTION_COUNT - 1 {
            break;
        }
        if record.name == target.name || options.contains(&record.name) {
            continue;
        }
        options.push(record.name.clone());
    }

    options.push(target.name.clone());
    options.shuffle(rng);
    options
}
