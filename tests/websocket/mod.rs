//! WebSocket delivery tests

mod delivery_tests;
