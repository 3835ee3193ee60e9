//! Unit tests for ws-core primitives.

#[cfg(test)]
mod ids {
    use crate::{AgentId, NodeId};

    #[test]
    fn invalid_sentinels() {
        assert_eq!(NodeId::INVALID.0, u32::MAX);
        assert!(!AgentId::INVALID.is_valid());
        assert!(NodeId(0).is_valid());
        assert_eq!(NodeId(12).index(), 12);
    }

    #[test]
    fn display_forms() {
        assert_eq!(AgentId(7).label(), "agent-7");
        assert_eq!(AgentId(7).to_string(), "agent-7");
        assert_eq!(NodeId(3).to_string(), "node#3");
    }
}

#[cfg(test)]
mod geo {
    use approx::assert_relative_eq;

    use crate::GeoPoint;

    #[test]
    fn zero_distance() {
        let p = GeoPoint::new(59.4031, 17.9424);
        assert!(p.distance_m(p) < 1e-9);
    }

    #[test]
    fn one_degree_latitude() {
        // ~1 degree of latitude ≈ 111.2 km
        let a = GeoPoint::new(59.0, 17.9);
        let b = GeoPoint::new(60.0, 17.9);
        let d = a.distance_m(b);
        assert!((d - 111_195.0).abs() < 50.0, "got {d}");
    }

    #[test]
    fn short_edge_on_equator() {
        // 0.001° of longitude at the equator ≈ 111.2 m
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(0.0, 0.001);
        assert_relative_eq!(a.distance_m(b), 111.195, epsilon = 0.01);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = GeoPoint::new(59.403, 17.942);
        let b = GeoPoint::new(59.407, 17.950);
        assert_relative_eq!(a.distance_m(b), b.distance_m(a), epsilon = 1e-9);
    }

    #[test]
    fn lerp_endpoints_and_midpoint() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(1.0, 2.0);
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
        let mid = a.lerp(b, 0.5);
        assert_relative_eq!(mid.lat, 0.5);
        assert_relative_eq!(mid.lon, 1.0);
    }
}

#[cfg(test)]
mod time {
    use crate::{SimClock, SimConfig, Tick};

    #[test]
    fn clock_advance_and_rewind() {
        let mut c = SimClock::new(1_700_000_000, 0.5);
        c.advance();
        c.advance();
        assert_eq!(c.current_tick, Tick(2));
        assert_eq!(c.elapsed_secs(), 1.0);
        assert_eq!(c.current_unix_ms(), 1_700_000_001_000);
        c.rewind();
        assert_eq!(c.current_tick, Tick::ZERO);
    }

    #[test]
    fn fractional_ticks_round_to_the_millisecond() {
        let mut c = SimClock::new(10, 0.7);
        for _ in 0..3 {
            c.advance();
        }
        assert_eq!(c.current_unix_ms(), 12_100);
        assert_eq!(c.unix_ms_at(Tick(3)), c.current_unix_ms());
        assert_eq!(c.unix_ms_at(Tick(10)), 17_000);
    }

    #[test]
    fn elapsed_hms() {
        let mut c = SimClock::new(0, 61.0);
        for _ in 0..60 {
            c.advance();
        }
        // 3660 s
        assert_eq!(c.elapsed_hms(), (1, 1, 0));
    }

    #[test]
    fn default_config_is_valid() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_tick_duration_rejected() {
        let cfg = SimConfig { tick_duration_secs: 0.0, ..SimConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn inverted_speed_range_rejected() {
        let cfg = SimConfig { min_speed_mps: 2.0, max_speed_mps: 1.0, ..SimConfig::default() };
        assert!(cfg.validate().is_err());
    }
}

#[cfg(test)]
mod rng {
    use crate::{AgentId, AgentRng, NodeId, SimRng};

    #[test]
    fn same_agent_same_stream() {
        let mut a = AgentRng::new(7, AgentId(3));
        let mut b = AgentRng::new(7, AgentId(3));
        for _ in 0..16 {
            assert_eq!(a.node(1_000), b.node(1_000));
        }
    }

    #[test]
    fn different_agents_diverge() {
        let mut a = AgentRng::new(7, AgentId(0));
        let mut b = AgentRng::new(7, AgentId(1));
        let xs: Vec<NodeId> = (0..8).map(|_| a.node(1 << 20)).collect();
        let ys: Vec<NodeId> = (0..8).map(|_| b.node(1 << 20)).collect();
        assert_ne!(xs, ys);
    }

    #[test]
    fn node_except_skips_current() {
        let mut r = AgentRng::new(5, AgentId(0));
        let mut seen = [0u32; 4];
        for _ in 0..400 {
            let n = r.node_except(NodeId(2), 4);
            assert_ne!(n, NodeId(2));
            seen[n.index()] += 1;
        }
        assert!(seen[0] > 0 && seen[1] > 0 && seen[3] > 0);
        assert_eq!(r.node_except(NodeId(0), 1), NodeId(0));
    }

    #[test]
    fn speed_within_bounds() {
        let mut r = AgentRng::new(1, AgentId(9));
        for _ in 0..100 {
            let v = r.speed(1.1, 1.7);
            assert!((1.1..1.7).contains(&v));
        }
    }

    #[test]
    fn pick_empty_is_none() {
        let mut r = AgentRng::new(1, AgentId(0));
        assert_eq!(r.pick::<u8>(&[]), None);
        assert_eq!(r.pick(&[4u8]), Some(4));
    }

    #[test]
    fn epoch_seeds_are_pure_and_distinct() {
        let a = SimRng::new(99);
        let b = SimRng::new(99);
        assert_eq!(a.epoch_seed(1), b.epoch_seed(1));
        assert_eq!(a.epoch_seed(1), a.epoch_seed(1));
        assert_ne!(a.epoch_seed(0), a.epoch_seed(1));
    }
}
