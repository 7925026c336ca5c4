//! Lightweight graph optimiser for programs.
//!
//! Pass pipeline
//! -------------
//!  1. **deduplicate** – collapse instructions that repeat an earlier
//!                       `(operator, operands)` pair onto the first occurrence.
//!  2. **reduce**      – drop every instruction the output does not depend on
//!                       and compact the remaining positions.
//!
//! Both passes rewrite operand references through a position map and carry the
//! origin of each surviving instruction along, so errors raised while running
//! an optimised program still name positions of the program the caller built.
//!
//! Every operator is a pure function of its operands, so an optimised program
//! produces bit-identical results to the program it came from.

use std::collections::HashMap;

use tracing::debug;

use crate::program::{Instruction, Program};

/// Run all optimisation passes.
pub fn optimize(program: &Program) -> Program {
    let (deduplicated, map) = deduplicate_with_map(program);
    let optimized = reduce(&deduplicated, map[program.output()]);
    debug!(
        before = program.len(),
        after = optimized.len(),
        "optimised program"
    );
    optimized
}

// ────────────────────────────────────────────────────────────────────────────
//  Pass 1 – deduplication
// ────────────────────────────────────────────────────────────────────────────

/// Collapses repeated instructions; returns the new program and the map from
/// old positions to new ones.
pub fn deduplicate(program: &Program) -> (Program, Vec<usize>) {
    let (deduplicated, map) = deduplicate_with_map(program);
    // the output may have collapsed onto an earlier instruction
    let root = map[program.output()];
    (truncate(&deduplicated, root), map)
}

fn deduplicate_with_map(program: &Program) -> (Program, Vec<usize>) {
    let mut seen: HashMap<Instruction, usize> = HashMap::with_capacity(program.len());
    let mut map = Vec::with_capacity(program.len());
    let mut instructions = Vec::with_capacity(program.len());
    let mut origins = Vec::with_capacity(program.len());

    for (position, instruction) in program.iter().enumerate() {
        let key = instruction.remap(|operand| map[operand]);
        let target = *seen.entry(key).or_insert_with(|| {
            instructions.push(key);
            origins.push(program.origin(position));
            instructions.len() - 1
        });
        map.push(target);
    }

    (rebuild(instructions, origins), map)
}

fn truncate(program: &Program, root: usize) -> Program {
    let instructions = program.instructions()[..=root].to_vec();
    let origins = (0..=root).map(|p| program.origin(p)).collect();
    rebuild(instructions, origins)
}

// ────────────────────────────────────────────────────────────────────────────
//  Pass 2 – reduction to the instructions the root depends on
// ────────────────────────────────────────────────────────────────────────────

/// Keeps only the instructions `root` depends on; `root` becomes the output.
pub fn reduce(program: &Program, root: usize) -> Program {
    let used = program.utilized_from(root);
    let mut map = vec![usize::MAX; program.len()];
    let mut instructions = Vec::with_capacity(program.len());
    let mut origins = Vec::with_capacity(program.len());

    for (position, instruction) in program.iter().enumerate().take(root + 1) {
        if !used[position] {
            continue;
        }
        map[position] = instructions.len();
        instructions.push(instruction.remap(|operand| map[operand]));
        origins.push(program.origin(position));
    }

    rebuild(instructions, origins)
}

/// Re-wraps instructions that came out of a valid program.
fn rebuild(instructions: Vec<Instruction>, origins: Vec<usize>) -> Program {
    // Backward references survive both passes: a used instruction only refers
    // to used instructions, and the maps are monotonic.
    match Program::with_origins(instructions, origins) {
        Ok(program) => program,
        Err(err) => unreachable!("optimiser produced an invalid program: {err}"),
    }
}
