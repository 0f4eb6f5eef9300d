mod test_rapid_relay_preserves_order;
