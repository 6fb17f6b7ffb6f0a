use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

use crate::models::puzzle::{Operator, Puzzle};
use crate::models::DifficultyTier;

struct LevelConfig {
    ops: &'static [Operator],
    range: (i64, i64),
}

fn level_config(level: DifficultyTier) -> LevelConfig {
    match level {
        DifficultyTier::Easy => LevelConfig {
            ops: &[Operator::Add, Operator::Sub],
            range: (1, 10),
        },
        DifficultyTier::Medium => LevelConfig {
            ops: &[Operator::Add, Operator::Sub, Operator::Mul],
            range: (5, 30),
        },
        DifficultyTier::Hard => LevelConfig {
            ops: &[Operator::Add, Operator::Sub, Operator::Mul, Operator::Div],
            range: (10, 150),
        },
    }
}

/// Integer quotient when exact, otherwise rounded to two decimals.
fn divide(a: i64, b: i64) -> f64 {
    if a % b == 0 {
        (a / b) as f64
    } else {
        ((a as f64 / b as f64) * 100.0).round() / 100.0
    }
}

/// Random arithmetic puzzle for `level`. A seed makes the result reproducible.
pub fn generate_puzzle(level: DifficultyTier, seed: Option<u64>) -> Puzzle {
    match seed {
        Some(seed) => generate_with(level, &mut StdRng::seed_from_u64(seed)),
        None => generate_with(level, &mut rand::rng()),
    }
}

pub fn generate_with<R: Rng>(level: DifficultyTier, rng: &mut R) -> Puzzle {
    let conf = level_config(level);
    let (low, high) = conf.range;
    let mut a = rng.random_range(low..=high);
    let mut b = rng.random_range(low..=high);
    let op = *conf.ops.choose(rng).unwrap_or(&Operator::Add);

    if op == Operator::Div && b == 0 {
        b = 1;
    }
    // Easy subtraction never goes negative.
    if level == DifficultyTier::Easy && op == Operator::Sub && a < b {
        std::mem::swap(&mut a, &mut b);
    }

    let answer = match op {
        Operator::Add => (a + b) as f64,
        Operator::Sub => (a - b) as f64,
        Operator::Mul => (a * b) as f64,
        Operator::Div => divide(a, b),
    };

    Puzzle {
        id: format!("{}_{}", level, rng.random::<u32>()),
        question: format!("{} {} {} = ?", a, op.symbol(), b),
        answer,
        level,
        op,
        operands: (a, b),
    }
}
