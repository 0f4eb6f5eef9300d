mod test_peer_leaves_others_stay;
mod test_three_peers_fan_out;
