//! Unit tests for ws-output.

#[cfg(test)]
mod csv_tests {
    use tempfile::TempDir;

    use crate::csv::{CsvWriter, POSITIONS_FILE, SUMMARIES_FILE};
    use crate::row::{AgentPositionRow, TickSummaryRow};
    use crate::writer::OutputWriter;

    fn tmp() -> TempDir {
        tempfile::tempdir().expect("create temp dir")
    }

    fn position(agent: u32, tick: u64) -> AgentPositionRow {
        AgentPositionRow {
            tick,
            agent_id:         format!("agent-{agent}"),
            lat:              59.4,
            lng:              17.95,
            current_node:     format!("n{agent}"),
            destination_node: "n9".into(),
        }
    }

    fn headers(path: std::path::PathBuf) -> Vec<String> {
        let mut rdr = csv::Reader::from_path(path).unwrap();
        rdr.headers().unwrap().iter().map(str::to_owned).collect()
    }

    #[test]
    fn creates_missing_directory() {
        let dir = tmp();
        let out = dir.path().join("nested").join("run");
        let _w = CsvWriter::new(&out).unwrap();
        assert!(out.join(POSITIONS_FILE).exists());
        assert!(out.join(SUMMARIES_FILE).exists());
    }

    #[test]
    fn header_rows() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        w.finish().unwrap();

        assert_eq!(
            headers(dir.path().join(POSITIONS_FILE)),
            ["tick", "agent_id", "lat", "lng", "current_node", "destination_node"]
        );
        assert_eq!(
            headers(dir.path().join(SUMMARIES_FILE)),
            ["tick", "unix_time_ms", "moving", "arrivals", "replanned"]
        );
    }

    #[test]
    fn position_rows_written() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        w.write_positions(&[position(0, 5), position(1, 5)]).unwrap();
        w.finish().unwrap();

        let mut rdr = csv::Reader::from_path(dir.path().join(POSITIONS_FILE)).unwrap();
        let rows: Vec<_> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "5");
        assert_eq!(&rows[0][1], "agent-0");
        assert_eq!(rows[1][2].parse::<f64>().unwrap(), 59.4);
        assert_eq!(&rows[1][4], "n1");
    }

    #[test]
    fn summary_row_written() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        w.write_tick_summary(&TickSummaryRow { tick: 3, unix_time_ms: 3_000, moving: 7, arrivals: 2, replanned: 1 })
            .unwrap();
        w.finish().unwrap();

        let mut rdr = csv::Reader::from_path(dir.path().join(SUMMARIES_FILE)).unwrap();
        let rows: Vec<_> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].iter().collect::<Vec<_>>(), ["3", "3000", "7", "2", "1"]);
    }

    #[test]
    fn finish_idempotent() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        w.finish().unwrap();
        w.finish().unwrap();
    }
}

#[cfg(test)]
mod observer_tests {
    use ws_core::{SimConfig, Tick};
    use ws_mobility::StepReport;
    use ws_sim::{SimObserver, SimSnapshot, SimulationBuilder, WalkSimConfig};
    use ws_spatial::WalkNetwork;

    use crate::csv::{CsvWriter, POSITIONS_FILE, SUMMARIES_FILE};
    use crate::observer::SimOutputObserver;
    use crate::row::{AgentPositionRow, TickSummaryRow};
    use crate::writer::OutputWriter;
    use crate::{OutputError, OutputResult};

    /// Fails every summary write; counts everything else.
    #[derive(Default)]
    struct Flaky {
        positions: usize,
        finished:  bool,
    }

    impl OutputWriter for Flaky {
        fn write_positions(&mut self, rows: &[AgentPositionRow]) -> OutputResult<()> {
            self.positions += rows.len();
            Ok(())
        }
        fn write_tick_summary(&mut self, row: &TickSummaryRow) -> OutputResult<()> {
            Err(OutputError::Io(std::io::Error::other(format!("tick {}", row.tick))))
        }
        fn finish(&mut self) -> OutputResult<()> {
            self.finished = true;
            Ok(())
        }
    }

    #[test]
    fn keeps_first_error() {
        let mut obs = SimOutputObserver::new(Flaky::default(), &SimConfig::default());
        obs.on_tick_end(Tick(1), &StepReport::default());
        obs.on_tick_end(Tick(2), &StepReport::default());
        obs.on_snapshot(&SimSnapshot { tick: 2, agents: Vec::new(), timestamp: 2_000 });
        obs.on_sim_end(Tick(2));

        let err = obs.take_error().unwrap();
        assert!(err.to_string().contains("tick 1"));
        assert!(obs.take_error().is_none());

        let writer = obs.into_writer();
        assert_eq!(writer.positions, 0);
        assert!(writer.finished);
    }

    const LINE_JSON: &str = r#"{
        "nodes": {
            "A": { "id": "A", "lat": 0.0, "lng": 0.0 },
            "B": { "id": "B", "lat": 0.0, "lng": 0.001 },
            "C": { "id": "C", "lat": 0.0, "lng": 0.002 }
        },
        "edges": [
            { "id": "e1", "from": "A", "to": "B" },
            { "id": "e2", "from": "B", "to": "C" }
        ]
    }"#;

    #[test]
    fn records_a_run() {
        let mut config = WalkSimConfig::default();
        config.offload.enabled = false;
        config.sim.agent_count = 3;
        config.sim.total_ticks = 6;
        config.sim.output_interval_ticks = 2;
        config.sim.start_unix_secs = 1_700_000_000;

        let network = WalkNetwork::from_json(LINE_JSON).unwrap();
        let mut sim = SimulationBuilder::new(config.clone(), network).build().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let mut obs = SimOutputObserver::new(CsvWriter::new(dir.path()).unwrap(), &config.sim);
        sim.run(&mut obs).unwrap();
        assert!(obs.take_error().is_none());

        // Snapshots at ticks 0, 2, 4, 6.
        let mut rdr = csv::Reader::from_path(dir.path().join(POSITIONS_FILE)).unwrap();
        let rows: Vec<_> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 4 * 3);
        assert_eq!(&rows[0][0], "0");
        assert_eq!(&rows[11][0], "6");
        assert_eq!(&rows[11][1], "agent-2");

        let mut rdr = csv::Reader::from_path(dir.path().join(SUMMARIES_FILE)).unwrap();
        let rows: Vec<_> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 6);
        assert_eq!(&rows[0][1], "1700000001000");
        for row in &rows {
            let counts: u64 = (2..5).map(|i| row[i].parse::<u64>().unwrap()).sum();
            assert_eq!(counts, 3);
        }
    }

    #[test]
    fn summary_time_matches_snapshot_time() {
        let mut config = WalkSimConfig::default();
        config.offload.enabled = false;
        config.sim.agent_count = 2;
        config.sim.total_ticks = 3;
        config.sim.tick_duration_secs = 0.7;
        config.sim.output_interval_ticks = 0;

        let network = WalkNetwork::from_json(LINE_JSON).unwrap();
        let mut sim = SimulationBuilder::new(config.clone(), network).build().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let mut obs = SimOutputObserver::new(CsvWriter::new(dir.path()).unwrap(), &config.sim);
        sim.run(&mut obs).unwrap();
        assert!(obs.take_error().is_none());

        let mut rdr = csv::Reader::from_path(dir.path().join(SUMMARIES_FILE)).unwrap();
        let rows: Vec<_> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(&rows[2][1], "2100");
        assert_eq!(rows[2][1].parse::<i64>().unwrap(), sim.get_state().timestamp);
    }
}
