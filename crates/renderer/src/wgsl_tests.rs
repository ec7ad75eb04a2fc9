#[test]
fn presenter_wgsl_sources_parse_successfully() {
    parse_wgsl("blit.wgsl", include_str!("blit.wgsl"));
}

#[test]
fn blit_shader_exposes_pipeline_entry_points() {
    let module = parse_wgsl("blit.wgsl", include_str!("blit.wgsl"));
    let entry_points: Vec<&str> = module
        .entry_points
        .iter()
        .map(|entry_point| entry_point.name.as_str())
        .collect();
    assert!(entry_points.contains(&"vs_main"));
    assert!(entry_points.contains(&"fs_main"));
}

fn parse_wgsl(label: &str, source: &str) -> naga::Module {
    naga::front::wgsl::parse_str(source).unwrap_or_else(|error| {
        panic!(
            "WGSL parse failed for {label}: {}",
            error.emit_to_string(source)
        )
    })
}
