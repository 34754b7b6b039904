use lucent::{App, AppConfig};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Optional OBJ overrides: lucent [opaque.obj] [transparent.obj]
    let mut args = std::env::args().skip(1);
    let config = AppConfig {
        opaque_obj: args.next().map(Into::into),
        transparent_obj: args.next().map(Into::into),
        ..Default::default()
    };

    App::new(config).run()?;
    Ok(())
}
