use std::collections::HashMap;

use jcm::{RunConfig, Variant, CONFIG_FILE_NAME};

pub fn collect_template_files(template_str: &str) -> Option<HashMap<String, String>> {
    let variant = template_str.parse::<Variant>().ok()?;
    let mut map = HashMap::new();
    map.insert(CONFIG_FILE_NAME.to_string(), template_commented(variant));
    Some(map)
}

// commented template, values are the variant defaults
fn template_commented(variant: Variant) -> String {
    let c = RunConfig::for_variant(variant);
    let scenarios = variant
        .scenarios()
        .iter()
        .map(|s| format!("#   {:<10} {}", s.name(), s.description()))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        r##"# Experiment file read by `jcm run`.
# Command line options take precedence over the values set here.

# scenario family, `transmission` or `variance`
# scenarios of this variant:
{scenarios}
variant = "{variant}"
# simulation runtime, passed as `-t`
runtime = {runtime}
# data sampling frequency, passed as `-d`
data_freq = {data_freq}
# replicates per run, and the index of the first one
replicates = {replicates}
offset = {offset}
# tee simulation output into `<scenario>_<index>.log`
logging = {logging}
# run the analysis program on every data file
analyse = {analyse}
# stop at the first failing simulation
fail_fast = {fail_fast}
# programs, relative paths are resolved against `work_dir`
sim_program = "{sim}"
analysis_program = "{analysis}"
# directory receiving data and log files, relative to this file
work_dir = "."
"##,
        scenarios = scenarios,
        variant = variant,
        runtime = c.runtime,
        data_freq = c.data_freq,
        replicates = c.replicates,
        offset = c.offset,
        logging = c.logging,
        analyse = c.analyse,
        fail_fast = c.fail_fast,
        sim = c.sim_program.display(),
        analysis = c.analysis_program.display(),
    )
}

#[test]
fn templates_hold_variant_defaults() {
    for variant in Variant::ALL.iter() {
        let text = template_commented(*variant);
        let partial = jcm::PartialConfig::from_toml_str(&text).unwrap();
        let config = RunConfig::from_layers(&[&partial]);
        let expected = RunConfig::for_variant(*variant);
        assert_eq!(config, expected);
    }
}
