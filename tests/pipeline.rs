mod common;

use censo_indigena::{
    bucket::AgeBand,
    coerce,
    config::PipelineConfig,
    error::{Diagnostics, PipelineError, Recovery, Stage},
    pipeline::Pipeline,
    repair::{self, FieldMismatchPolicy},
};

use common::{PACKED_HEADER, TestWorkspace};

const SAMPLE_ROWS: &[&str] = &[
    "1100015,Homens,15 a 19 anos,Alfabetizadas,40",
    "1100015,Mulheres,20 a 24 anos,Alfabetizadas,25",
    "1100015,Homens,60 ou mais,Não alfabetizadas,3",
    "1100023,Mulheres,Não informado,Alfabetizadas,",
    "1100023,Homens,45 a 49 anos,Alfabetizadas,x",
];

#[test]
fn repaired_table_has_five_fields_and_no_packed_column() {
    let workspace = TestWorkspace::new();
    let path = workspace.write_census("censo.csv", SAMPLE_ROWS);
    let pipeline = Pipeline::new(PipelineConfig::new(&path));

    let raw = pipeline.load().expect("load");
    assert!(raw.headers.iter().any(|h| h == PACKED_HEADER));

    let repaired = repair::repair(raw, FieldMismatchPolicy::Fail, &mut Diagnostics::default())
        .expect("repair");
    let headers = repaired.headers();
    assert!(!headers.iter().any(|h| h == PACKED_HEADER));
    for field in repair::FIELD_NAMES {
        assert!(headers.iter().any(|h| h == field), "missing {field}");
    }
    assert_eq!(repaired.records.len(), SAMPLE_ROWS.len());
}

#[test]
fn end_to_end_example_fills_with_single_median() {
    let workspace = TestWorkspace::new();
    let path = workspace.write_census(
        "censo.csv",
        &["1,F,20 a 24 anos,Sim,150", "1,M,60 ou mais,Nao,abc"],
    );
    let pipeline = Pipeline::new(PipelineConfig::new(&path));

    let exploration = pipeline.explore().expect("explore");
    assert_eq!(exploration.table.population(), vec![Some(150.0), None]);

    let output = pipeline.run().expect("run");
    let table = &output.census.table;
    assert_eq!(table.population(), vec![150.0, 150.0]);
    let bands = table
        .records
        .iter()
        .map(|r| r.faixa_etaria.map(AgeBand::label))
        .collect::<Vec<_>>();
    assert_eq!(bands, vec![Some("18-29"), Some("60+")]);
    assert_eq!(output.statistics.mean, 150.0);
    assert_eq!(output.statistics.variance, Some(0.0));
}

#[test]
fn present_values_survive_imputation_unchanged() {
    let workspace = TestWorkspace::new();
    let path = workspace.write_census("censo.csv", SAMPLE_ROWS);
    let pipeline = Pipeline::new(PipelineConfig::new(&path));

    let before = pipeline.explore().expect("explore").table.population();
    let census = pipeline.census().expect("census");
    let after = census.table.population();

    let present = before.iter().flatten().copied().collect::<Vec<_>>();
    let expected_median = coerce::median(&present).expect("median");
    assert_eq!(expected_median, 25.0);
    assert_eq!(census.imputation.median, expected_median);
    assert_eq!(census.imputation.filled, 2);

    for (original, filled) in before.iter().zip(&after) {
        match original {
            Some(value) => assert_eq!(value, filled),
            None => assert_eq!(*filled, expected_median),
        }
    }
}

#[test]
fn unbanded_labels_are_recovered_not_fatal() {
    let workspace = TestWorkspace::new();
    let path = workspace.write_census("censo.csv", SAMPLE_ROWS);
    let census = Pipeline::new(PipelineConfig::new(&path))
        .census()
        .expect("census");

    assert_eq!(census.table.records[3].faixa_etaria, None);
    assert!(census.diagnostics.events().contains(&Recovery::AgeExtractionFailed {
        row: 5,
        label: "Não informado".to_string(),
    }));
    assert_eq!(census.diagnostics.count(Stage::Coerce), 2);
}

#[test]
fn numeric_extra_columns_join_the_correlation_matrix() {
    let workspace = TestWorkspace::new();
    let path = workspace.write(
        "censo.csv",
        &format!(
            "peso;\"{PACKED_HEADER}\";nome\n\
             1;\"1,F,20 a 24 anos,Sim,10\";a\n\
             2;\"1,M,20 a 24 anos,Sim,20\";b\n\
             3;\"1,F,30 a 34 anos,Sim,30\";c\n"
        ),
    );
    let output = Pipeline::new(PipelineConfig::new(&path)).run().expect("run");
    let matrix = &output.correlation;
    assert_eq!(matrix.columns, vec!["populacao_indigena", "peso"]);
    let r = matrix.get("populacao_indigena", "peso").expect("defined");
    assert!((r - 1.0).abs() < 1e-12);
    assert_eq!(matrix.get("peso", "populacao_indigena"), Some(r));
}

#[test]
fn missing_packed_column_is_a_schema_mismatch() {
    let workspace = TestWorkspace::new();
    let path = workspace.write("censo.csv", "id_municipio;sexo\n1;F\n");
    let err = Pipeline::new(PipelineConfig::new(&path))
        .run()
        .expect_err("schema mismatch");
    assert!(matches!(err, PipelineError::SchemaMismatch { .. }));
    assert_eq!(err.stage(), Stage::Repair);
}

#[test]
fn short_packed_row_fails_or_is_skipped_by_policy() {
    let workspace = TestWorkspace::new();
    let path = workspace.write_census(
        "censo.csv",
        &["1,F,20 a 24 anos,Sim,150", "1,M,60 ou mais"],
    );

    let err = Pipeline::new(PipelineConfig::new(&path))
        .run()
        .expect_err("field mismatch");
    assert!(matches!(
        err,
        PipelineError::FieldCountMismatch { row: 3, found: 3, .. }
    ));

    let output = Pipeline::new(
        PipelineConfig::new(&path).with_field_mismatch(FieldMismatchPolicy::Skip),
    )
    .run()
    .expect("run with skip");
    assert_eq!(output.census.table.len(), 1);
    assert_eq!(output.census.diagnostics.count(Stage::Repair), 1);
}

#[test]
fn all_missing_population_is_an_empty_column_error() {
    let workspace = TestWorkspace::new();
    let path = workspace.write_census(
        "censo.csv",
        &["1,F,20 a 24 anos,Sim,-", "1,M,60 ou mais,Nao,"],
    );
    let err = Pipeline::new(PipelineConfig::new(&path))
        .run()
        .expect_err("empty column");
    assert!(matches!(err, PipelineError::EmptyColumn { .. }));
}

#[test]
fn latin1_input_decodes_with_configured_encoding() {
    let workspace = TestWorkspace::new();
    let mut contents = format!("\"{PACKED_HEADER}\"\n").into_bytes();
    contents.extend_from_slice(b"\"1,F,N\xe3o informado,Sim,4\"\n");
    let path = workspace.write_bytes("latin1.csv", &contents);

    let err = Pipeline::new(PipelineConfig::new(&path))
        .run()
        .expect_err("invalid utf-8");
    assert!(matches!(err, PipelineError::MalformedInput { .. }));

    let census = Pipeline::new(PipelineConfig::new(&path).with_encoding("latin1"))
        .census()
        .expect("latin1 census");
    assert_eq!(census.table.records[0].grupo_idade, "Não informado");
}

#[test]
fn missing_input_is_not_found() {
    let workspace = TestWorkspace::new();
    let err = Pipeline::new(PipelineConfig::new(workspace.path().join("absent.csv")))
        .run()
        .expect_err("not found");
    assert!(matches!(err, PipelineError::NotFound { .. }));
    assert_eq!(err.stage(), Stage::Load);
}
