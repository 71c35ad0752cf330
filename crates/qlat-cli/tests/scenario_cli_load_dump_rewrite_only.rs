use assert_cmd::Command;

#[test]
fn scenario_cli_load_dump_rewrite_only() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    std::fs::write(
        tmp.path().join("in.jsonl"),
        "{\"message_id\":\"a\"}\nnot json\n{\"message_id\":\"b\",\"sent_epoch\":1}\n",
    )?;

    Command::cargo_bin("qlat")?
        .current_dir(tmp.path())
        .env_remove("REDIS_URL")
        .args([
            "load-dump",
            "--in-dump",
            "in.jsonl",
            "--out-dump",
            "out.jsonl",
            "--epoch-unit",
            "s",
            "--base-epoch",
            "1700000000",
            "--step",
            "5",
        ])
        .assert()
        .success();

    let out = std::fs::read_to_string(tmp.path().join("out.jsonl"))?;
    let lines: Vec<serde_json::Value> = out
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?;
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["sent_epoch"], 1_700_000_000i64);
    assert_eq!(lines[1]["sent_epoch"], 1_700_000_005i64);
    assert_eq!(lines[1]["message_id"], "b");
    Ok(())
}
