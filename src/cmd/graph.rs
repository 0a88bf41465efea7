use anyhow::{Context, Result};
use crucible::resolver::{DependencyResolver, ResolverConfig};
use std::path::PathBuf;

pub fn execute(
    source: PathBuf,
    base_dir: Option<PathBuf>,
    max_depth: Option<usize>,
    json: bool,
) -> Result<()> {
    let source = source
        .canonicalize()
        .with_context(|| format!("Failed to resolve source path {}", source.display()))?;

    let base_dir = match base_dir {
        Some(dir) => dir,
        None if source.is_dir() => source.clone(),
        None => source
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| source.clone()),
    };

    let mut config = ResolverConfig::new(base_dir);
    if let Some(depth) = max_depth {
        config = config.with_max_depth(depth);
    }

    let mut resolver = DependencyResolver::new(config);
    let stats = resolver.statistics(&source);

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Dependencies of {}", stats.root.display());
    println!("  Direct:    {}", stats.direct_dependency_count);
    println!("  Total:     {}", stats.total_dependency_count);
    println!("  Max depth: {}", stats.max_depth);
    if stats.has_circular_dependencies {
        println!("  Circular:");
        for (from, to) in &stats.circular_dependencies {
            println!("    {} -> {}", from.display(), to.display());
        }
    } else {
        println!("  Circular:  none");
    }

    Ok(())
}
