//! Pool configuration from files and the environment

use slabptr::{Error, PoolConfig, Result, SlabPool};
use std::path::PathBuf;

fn temp_config(name: &str, contents: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("slabptr_config_{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write config");
    path
}

// Environment variables are process-wide, so every layering case runs in
// one test.
#[test]
fn test_config_layering() -> Result<()> {
    std::env::remove_var("SLABPTR_SLAB_CAPACITY");
    std::env::remove_var("SLABPTR_MAX_SLABS");

    // Defaults only
    let config = PoolConfig::load(None::<&str>)?;
    assert_eq!(config, PoolConfig::default());

    // File overrides defaults
    let path = temp_config("pool.toml", "slab_capacity = 64\nmax_slabs = 8\n");
    let config = PoolConfig::load(Some(&path))?;
    assert_eq!(config, PoolConfig::new(64, 8));

    // Environment overrides the file
    std::env::set_var("SLABPTR_MAX_SLABS", "2");
    let config = PoolConfig::load(Some(&path));
    std::env::remove_var("SLABPTR_MAX_SLABS");
    assert_eq!(config?, PoolConfig::new(64, 2));

    // Out-of-range values are rejected after layering
    let bad = temp_config("bad.toml", "slab_capacity = 70000\n");
    assert!(matches!(
        PoolConfig::load(Some(&bad)),
        Err(Error::InvalidConfig(_))
    ));

    // A missing file is an error when explicitly requested
    let missing = std::env::temp_dir().join("slabptr_missing_config.toml");
    assert!(matches!(
        PoolConfig::load(Some(&missing)),
        Err(Error::Config(_))
    ));

    std::fs::remove_dir_all(path.parent().expect("config dir")).ok();
    Ok(())
}

#[test]
fn test_pool_from_toml() -> Result<()> {
    let config = PoolConfig::from_toml_str("slab_capacity = 2\nmax_slabs = 2\n")?;
    let mut pool: SlabPool<u16> = SlabPool::with_config(config)?;
    assert_eq!(pool.capacity(), 3);

    for i in 0..3 {
        pool.insert(i)?;
    }
    assert!(matches!(
        pool.allocate(),
        Err(Error::PoolExhausted { capacity: 3 })
    ));
    Ok(())
}
