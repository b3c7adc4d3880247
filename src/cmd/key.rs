use anyhow::{Context, Result};
use board_common::{JitterSource, KeyGenerator, NoJitter, OrderKey};
use forge_board::config::OrderingSection;

/// Print a key between the optional bounds.
pub fn cmd_key(
    ordering: &OrderingSection,
    left: Option<&str>,
    right: Option<&str>,
    no_jitter: bool,
) -> Result<()> {
    let key = if no_jitter {
        let keys = KeyGenerator::with_jitter(NoJitter)
            .with_max_len(ordering.max_key_length)
            .with_jitter_window(ordering.jitter_window);
        generate(keys, left, right)?
    } else {
        generate(ordering.key_generator(), left, right)?
    };
    println!("{}", key);
    Ok(())
}

fn generate<J: JitterSource>(
    mut keys: KeyGenerator<J>,
    left: Option<&str>,
    right: Option<&str>,
) -> Result<OrderKey> {
    let left = parse_bound(left, "left")?;
    let right = parse_bound(right, "right")?;
    Ok(keys.generate(left.as_ref(), right.as_ref())?)
}

fn parse_bound(raw: Option<&str>, which: &str) -> Result<Option<OrderKey>> {
    raw.map(|s| {
        s.parse::<OrderKey>()
            .with_context(|| format!("Invalid {} bound", which))
    })
    .transpose()
}
