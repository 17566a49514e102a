//! Property-based tests for configuration module
//!
//! Generates random valid configurations and checks that they validate and
//! survive a TOML round-trip.

use super::*;
use proptest::prelude::*;

fn transform_strategy() -> impl Strategy<Value = OutputTransform> {
    prop_oneof![
        Just(OutputTransform::Normal),
        Just(OutputTransform::Rotate90),
        Just(OutputTransform::Rotate180),
        Just(OutputTransform::Rotate270),
        Just(OutputTransform::Flipped),
        Just(OutputTransform::Flipped90),
        Just(OutputTransform::Flipped180),
        Just(OutputTransform::Flipped270),
    ]
}

prop_compose! {
    fn valid_mode_config()(
        width in 1i32..8000,
        height in 1i32..8000,
        refresh_rate in 0.0f64..240.0,
    ) -> ModeConfig {
        ModeConfig { width, height, refresh_rate }
    }
}

prop_compose! {
    fn valid_output_config()(
        index in 0u32..8,
        enable in any::<bool>(),
        x in -10000i32..10000,
        y in -10000i32..10000,
        scale in 0.25f64..4.0,
        transform in transform_strategy(),
        mode in valid_mode_config(),
        modes in prop::collection::vec(valid_mode_config(), 0..3),
    ) -> OutputConfig {
        OutputConfig {
            name: format!("DP-{}", index),
            enable,
            x,
            y,
            scale,
            transform,
            mode,
            modes,
        }
    }
}

prop_compose! {
    fn valid_cloth_config()(
        debug in any::<bool>(),
        count in 1usize..=MAX_WORKSPACES,
        names in prop::collection::vec("[a-z]{1,8}", 0..5),
        outputs in prop::collection::vec(valid_output_config(), 0..4),
    ) -> ClothConfig {
        ClothConfig {
            general: GeneralConfig { debug },
            workspaces: WorkspacesConfig { count, names },
            headless: HeadlessConfig::default(),
            outputs,
        }
    }
}

proptest! {
    /// Generated configurations pass validation
    #[test]
    fn test_config_validation(config in valid_cloth_config()) {
        prop_assert!(config.validate().is_ok());
    }

    /// TOML round-trip keeps the settings the engine reads
    #[test]
    fn test_config_toml_roundtrip(config in valid_cloth_config()) {
        let toml_str = toml::to_string(&config)?;
        let parsed: ClothConfig = toml::from_str(&toml_str)?;

        prop_assert_eq!(config.general.debug, parsed.general.debug);
        prop_assert_eq!(&config.workspaces, &parsed.workspaces);
        prop_assert_eq!(config.outputs.len(), parsed.outputs.len());
        for (a, b) in config.outputs.iter().zip(parsed.outputs.iter()) {
            prop_assert_eq!(&a.name, &b.name);
            prop_assert_eq!(a.transform, b.transform);
            prop_assert_eq!((a.x, a.y), (b.x, b.y));
            prop_assert!((a.scale - b.scale).abs() < 1e-9);
            prop_assert_eq!(a.mode.width, b.mode.width);
        }
    }

    /// Workspace names fall back to 1-based numbers
    #[test]
    fn test_workspace_names(count in 1usize..=MAX_WORKSPACES, named in 0usize..5) {
        let names: Vec<String> = (0..named).map(|i| format!("ws{}", i)).collect();
        let ws = WorkspacesConfig { count, names };
        for i in 0..count {
            let expected = if i < named { format!("ws{}", i) } else { format!("{}", i + 1) };
            prop_assert_eq!(ws.name(i), expected);
        }
    }
}
