use portal_scene::PortalConfig;

fn main() -> anyhow::Result<()> {
    // An explicit asset directory wins over PORTAL_ASSETS.
    let config = match std::env::args().nth(1) {
        Some(root) => PortalConfig::from_env().with_assets_root(root),
        None => PortalConfig::from_env(),
    };
    portal_scene::run(config)
}
