/// JSON record of what was built, printed by `--build-info`.
pub fn report(name: &str) -> String {
    format!(
        "{{\n  \"name\": \"{}\",\n  \"version\": \"{}\",\n  \"git_describe\": \"{}\",\n  \"git_hash\": \"{}\"\n}}",
        name,
        env!("CARGO_PKG_VERSION"),
        env!("GIT_DESCRIBE"),
        env!("GIT_HASH")
    )
}

pub fn print_report(name: &str) {
    println!("{}", report(name));
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn report_fields() {
        let r = report("wave");
        assert!(r.starts_with('{'));
        assert!(r.contains("\"name\": \"wave\""));
        assert!(r.contains(&format!("\"version\": \"{}\"", env!("CARGO_PKG_VERSION"))));
        assert!(r.contains("\"git_hash\""));
    }
}
