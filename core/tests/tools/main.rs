mod registry_flow;
