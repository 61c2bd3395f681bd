pub mod estate_graph;
