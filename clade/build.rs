fn main() -> Result<(), Box<dyn std::error::Error>> {
    tonic_build::configure()
        .build_server(false)
        .build_client(true)
        .type_attribute("clade.meta.DatabaseRefId", "#[derive(Eq, Hash)]")
        .type_attribute("clade.meta.SchemaRefId", "#[derive(Eq, Hash)]")
        .type_attribute("clade.meta.TableRefId", "#[derive(Eq, Hash)]")
        .compile(&["proto/meta.proto"], &["proto"])?;

    Ok(())
}
