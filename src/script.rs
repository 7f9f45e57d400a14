//! Script assembly: ordered steps → one shell script body

use crate::workflow::Step;

/// First line of every assembled script
pub const PRELUDE: &str = "set -e";

/// Concatenate the inline shell commands of `steps` into one script.
///
/// Steps without a `run` body are skipped entirely, name included.
/// Blank lines are dropped and every line is trimmed, so the output is a
/// pure function of the step list.
pub fn assemble(steps: &[Step]) -> String {
    let mut script = String::with_capacity(64);
    script.push_str(PRELUDE);
    script.push('\n');

    for step in steps {
        let Some(run) = step.run.as_deref() else {
            continue;
        };
        let mut body = run.lines().map(str::trim).filter(|l| !l.is_empty()).peekable();
        if body.peek().is_none() {
            continue;
        }

        if let Some(name) = step.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            script.push_str("# ");
            script.push_str(name);
            script.push('\n');
        }
        for line in body {
            script.push_str(line);
            script.push('\n');
        }
    }

    script
}
